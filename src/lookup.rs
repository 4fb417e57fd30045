//! Read-only queries over fetched rows.
//!
//! The free functions work on header-stripped rows. The service methods fetch
//! a range, strip the header and shape the result for the HTTP layer. Only
//! [`RankingService::username`] writes: an unseen user key is registered
//! with a placeholder name the first time it is read.

use log::info;
use serde::Serialize;

use crate::gateway::{GatewayError, Row};
use crate::rows::{
    MAPPING_NAME, MAPPING_USER_KEY, PLACEHOLDER_NAME, RATING_USER_KEY, RatingRow, SpotRow,
    UserMapping, cell, data_rows, mapping_range, ratings_range, spots_range,
};
use crate::score::{LOOKUP_MISSING_SCORE, score_or};
use crate::service::{RankingService, mapping_lock_key};

pub fn position_by_key(rows: &[Row], matches: impl Fn(&[String]) -> bool) -> Option<usize> {
    rows.iter().position(|row| matches(row))
}

pub fn find_by_key(rows: &[Row], matches: impl Fn(&[String]) -> bool) -> Option<&Row> {
    rows.iter().find(|row| matches(row))
}

pub fn filter_by_key(rows: &[Row], matches: impl Fn(&[String]) -> bool) -> Vec<&Row> {
    rows.iter().filter(|row| matches(row)).collect()
}

pub fn exists(rows: &[Row], matches: impl Fn(&[String]) -> bool) -> bool {
    rows.iter().any(|row| matches(row))
}

/// One entry of a user's rating history, cells passed through as stored.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRating {
    pub spot_name: String,
    pub crust: String,
    pub sauce: String,
    pub cheese: String,
    pub overall_flavor: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RatingScores {
    pub crust: f64,
    pub sauce: f64,
    pub cheese: f64,
    pub flavor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoredRating {
    pub ratings: Option<RatingScores>,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSummary {
    pub spot_name: String,
    pub address: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotResponse {
    pub spot_name: String,
    pub crust: String,
    pub sauce: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpotListing {
    pub spots: Vec<SpotSummary>,
    pub responses: Vec<SpotResponse>,
}

impl RankingService {
    pub async fn user_ratings(&self, user_key: &str) -> Result<Vec<UserRating>, GatewayError> {
        let rows = self.gateway.get(&ratings_range()).await?;

        Ok(
            filter_by_key(data_rows(&rows), |row| cell(row, RATING_USER_KEY) == user_key)
                .into_iter()
                .map(|row| {
                    let rating = RatingRow::from_cells(row);
                    UserRating {
                        spot_name: rating.spot_name,
                        crust: rating.crust,
                        sauce: rating.sauce,
                        cheese: rating.cheese,
                        overall_flavor: rating.flavor,
                    }
                })
                .collect(),
        )
    }

    /// The stored rating for (user, spot). Unusable scores read as
    /// [`LOOKUP_MISSING_SCORE`].
    pub async fn rating_for(
        &self,
        user_key: &str,
        spot_name: &str,
    ) -> Result<StoredRating, GatewayError> {
        let rows = self.gateway.get(&ratings_range()).await?;

        let Some(row) = find_by_key(data_rows(&rows), |row| {
            RatingRow::is_for(row, user_key, spot_name)
        }) else {
            return Ok(StoredRating {
                ratings: None,
                notes: String::new(),
            });
        };

        let rating = RatingRow::from_cells(row);
        Ok(StoredRating {
            ratings: Some(RatingScores {
                crust: score_or(&rating.crust, LOOKUP_MISSING_SCORE),
                sauce: score_or(&rating.sauce, LOOKUP_MISSING_SCORE),
                cheese: score_or(&rating.cheese, LOOKUP_MISSING_SCORE),
                flavor: score_or(&rating.flavor, LOOKUP_MISSING_SCORE),
            }),
            notes: rating.notes,
        })
    }

    /// The mapped display name, if the user key is known.
    pub async fn display_name(&self, user_key: &str) -> Result<Option<String>, GatewayError> {
        let rows = self.gateway.get(&mapping_range()).await?;

        Ok(
            find_by_key(data_rows(&rows), |row| cell(row, MAPPING_USER_KEY) == user_key)
                .map(|row| cell(row, MAPPING_NAME).to_string()),
        )
    }

    /// The display name for `user_key`, registering [`PLACEHOLDER_NAME`] for
    /// keys seen for the first time.
    pub async fn username(&self, user_key: &str) -> Result<String, GatewayError> {
        let _guard = self.locks.lock(&mapping_lock_key(user_key)).await;

        if let Some(name) = self.display_name(user_key).await? {
            return Ok(name);
        }

        self.gateway
            .append(
                &mapping_range(),
                vec![
                    UserMapping {
                        user_key: user_key.to_string(),
                        display_name: PLACEHOLDER_NAME.to_string(),
                    }
                    .into_cells(),
                ],
            )
            .await?;
        info!("Registered new user key {user_key}");

        Ok(PLACEHOLDER_NAME.to_string())
    }

    pub async fn verify_code(&self, user_key: &str) -> Result<bool, GatewayError> {
        let rows = self.gateway.get(&mapping_range()).await?;
        Ok(exists(data_rows(&rows), |row| {
            cell(row, MAPPING_USER_KEY) == user_key
        }))
    }

    /// Every spot, plus the crust and sauce scores `user_key` gave so far.
    pub async fn spots(&self, user_key: &str) -> Result<SpotListing, GatewayError> {
        let spot_rows = self.gateway.get(&spots_range()).await?;
        let spots = data_rows(&spot_rows)
            .iter()
            .map(|row| {
                let spot = SpotRow::from_cells(row);
                SpotSummary {
                    spot_name: spot.spot_name,
                    address: spot.address,
                    description: spot.description,
                }
            })
            .collect();

        let rating_rows = self.gateway.get(&ratings_range()).await?;
        let responses = filter_by_key(data_rows(&rating_rows), |row| {
            cell(row, RATING_USER_KEY) == user_key
        })
        .into_iter()
        .map(|row| {
            let rating = RatingRow::from_cells(row);
            SpotResponse {
                spot_name: rating.spot_name,
                crust: rating.crust,
                sauce: rating.sauce,
            }
        })
        .collect();

        Ok(SpotListing { spots, responses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SheetGateway;
    use crate::workbook::{Workbook, WorkbookGateway};
    use std::sync::Arc;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn service_with(ratings: Vec<Row>, mappings: Vec<Row>) -> (Arc<WorkbookGateway>, RankingService) {
        let mut workbook = Workbook::bootstrap();
        workbook
            .append(
                &spots_range(),
                vec![
                    row(&["Joe's", "7 Carmine St", "Classic", "", "TRUE"]),
                    row(&["L&B", "2725 86th St", "Square pie"]),
                ],
            )
            .unwrap();
        if !ratings.is_empty() {
            workbook.append(&ratings_range(), ratings).unwrap();
        }
        if !mappings.is_empty() {
            workbook.append(&mapping_range(), mappings).unwrap();
        }
        let gateway = Arc::new(WorkbookGateway::in_memory(workbook));
        (gateway.clone(), RankingService::new(gateway))
    }

    #[test]
    fn key_helpers_operate_on_data_rows() {
        let rows = vec![row(&["u1", "A"]), row(&["u2", "B"]), row(&["u1", "C"])];
        let is_u1 = |r: &[String]| cell(r, 0) == "u1";

        assert_eq!(position_by_key(&rows, is_u1), Some(0));
        assert_eq!(find_by_key(&rows, is_u1), Some(&rows[0]));
        assert_eq!(filter_by_key(&rows, is_u1).len(), 2);
        assert!(exists(&rows, is_u1));
        assert!(!exists(&rows, |r| cell(r, 0) == "u3"));
    }

    #[tokio::test]
    async fn rating_for_substitutes_default_scores() {
        let (_, service) = service_with(
            vec![row(&["u1", "Joe's", "Ann", "crunchy", "6", "", "0", "good"])],
            vec![],
        );

        let stored = service.rating_for("u1", "Joe's").await.unwrap();
        assert_eq!(
            stored.ratings,
            Some(RatingScores {
                crust: 5.0,
                sauce: 6.0,
                cheese: 5.0,
                flavor: 5.0,
            })
        );
        assert_eq!(stored.notes, "good");
    }

    #[tokio::test]
    async fn rating_for_missing_pair_is_null() {
        let (_, service) = service_with(vec![row(&["u1", "Joe's", "Ann", "7"])], vec![]);

        let stored = service.rating_for("u1", "L&B").await.unwrap();
        assert_eq!(stored.ratings, None);
        assert_eq!(stored.notes, "");
    }

    #[tokio::test]
    async fn user_ratings_filters_by_key() {
        let (_, service) = service_with(
            vec![
                row(&["u1", "Joe's", "Ann", "7", "6", "8", "9"]),
                row(&["u2", "Joe's", "Bob", "1", "1", "1", "1"]),
                row(&["u1", "L&B", "Ann", "5", "5", "5", "5"]),
            ],
            vec![],
        );

        let history = service.user_ratings("u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history[0],
            UserRating {
                spot_name: "Joe's".into(),
                crust: "7".into(),
                sauce: "6".into(),
                cheese: "8".into(),
                overall_flavor: "9".into(),
            }
        );
        assert_eq!(history[1].spot_name, "L&B");
    }

    #[tokio::test]
    async fn username_registers_placeholder_once() {
        let (gateway, service) = service_with(vec![], vec![]);

        assert_eq!(service.username("new").await.unwrap(), PLACEHOLDER_NAME);
        assert_eq!(service.username("new").await.unwrap(), PLACEHOLDER_NAME);

        let rows = gateway.get(&mapping_range()).await.unwrap();
        assert_eq!(data_rows(&rows), &[row(&["new", PLACEHOLDER_NAME])]);
    }

    #[tokio::test]
    async fn username_returns_existing_name() {
        let (_, service) = service_with(vec![], vec![row(&["u1", "Ann"])]);
        assert_eq!(service.username("u1").await.unwrap(), "Ann");
    }

    #[tokio::test]
    async fn verify_code_checks_mapping_without_writing() {
        let (gateway, service) = service_with(vec![], vec![row(&["u1", "Ann"])]);
        let before = gateway.snapshot().unwrap();

        assert!(service.verify_code("u1").await.unwrap());
        assert!(!service.verify_code("ghost").await.unwrap());
        // The header row is not a user.
        assert!(!service.verify_code("UID").await.unwrap());
        assert_eq!(gateway.snapshot().unwrap(), before);
    }

    #[tokio::test]
    async fn spots_lists_all_spots_and_own_responses() {
        let (_, service) = service_with(
            vec![
                row(&["u1", "Joe's", "Ann", "7", "6", "8", "9"]),
                row(&["u2", "L&B", "Bob", "1", "2", "3", "4"]),
            ],
            vec![],
        );

        let listing = service.spots("u1").await.unwrap();
        assert_eq!(listing.spots.len(), 2);
        assert_eq!(listing.spots[1].description, "Square pie");
        assert_eq!(
            listing.responses,
            vec![SpotResponse {
                spot_name: "Joe's".into(),
                crust: "7".into(),
                sauce: "6".into(),
            }]
        );
    }
}
