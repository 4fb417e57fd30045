//! Read-modify-write against the store.
//!
//! [`upsert`] fetches a whole-column range, scans the data rows for the first
//! match and either rewrites that row in place or appends a new one. The
//! callers in this module hold the per-key lock from [`KeyedLocks`] around
//! the call so two writers for the same key cannot both miss and append.
//!
//! [`KeyedLocks`]: crate::locks::KeyedLocks

use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use serde::Deserialize;

use crate::gateway::{GatewayError, Row, SheetGateway};
use crate::lookup::position_by_key;
use crate::range::SheetRange;
use crate::rows::{
    MAPPING_USER_KEY, RANKED_TRUE, RATING_NOTES, RatingRow, SPOT_NAME, SPOT_RANKED, UNKNOWN_USER,
    UserMapping, cell, data_rows, mapping_range, ratings_range, sheet_row_number, spots_range,
};
use crate::score::{ScoreInput, input_cell};
use crate::service::{RankingService, mapping_lock_key, rating_lock_key};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// An existing row was rewritten at this 1-based sheet row.
    Updated { row: u32 },
    Appended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankedOutcome {
    Ranked { row: u32 },
    NotFound,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Scores {
    #[serde(default)]
    pub crust: Option<ScoreInput>,
    #[serde(default)]
    pub sauce: Option<ScoreInput>,
    #[serde(default)]
    pub cheese: Option<ScoreInput>,
    #[serde(default, alias = "overallFlavor")]
    pub flavor: Option<ScoreInput>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSubmission {
    #[serde(alias = "clientUID", alias = "userCode")]
    pub user_key: String,
    pub spot_name: String,
    /// Name to store with the rating; looked up from the mapping sheet when
    /// absent.
    #[serde(default, alias = "user")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub ratings: Scores,
}

/// Rewrite the first data row of `range` matching `matches`, or append one.
///
/// `range` must be a whole-column range whose first row is the header, so
/// data index `i` lives on sheet row `i + 2`. `build` receives the existing
/// row when there is one.
pub async fn upsert<M, B>(
    gateway: &dyn SheetGateway,
    range: &SheetRange,
    matches: M,
    build: B,
) -> Result<UpsertOutcome, GatewayError>
where
    M: Fn(&[String]) -> bool,
    B: FnOnce(Option<&[String]>) -> Row,
{
    let rows = gateway.get(range).await?;
    let data = data_rows(&rows);

    match position_by_key(data, matches) {
        Some(idx) => {
            let row = sheet_row_number(idx);
            let values = build(Some(&data[idx]));
            gateway.update(&range.row_span(row), vec![values]).await?;
            Ok(UpsertOutcome::Updated { row })
        }
        None => {
            gateway.append(range, vec![build(None)]).await?;
            Ok(UpsertOutcome::Appended)
        }
    }
}

impl RankingService {
    /// Store a rating for (user, spot), then flag the spot as ranked.
    ///
    /// A repeat submission for the same pair rewrites the row and appends
    /// the new notes below the old ones.
    pub async fn submit_rating(
        &self,
        submission: RatingSubmission,
    ) -> Result<UpsertOutcome, GatewayError> {
        let RatingSubmission {
            user_key,
            spot_name,
            user_name,
            notes,
            ratings,
        } = submission;

        let user_name = match user_name.filter(|name| !name.is_empty()) {
            Some(name) => name,
            None => self
                .display_name(&user_key)
                .await?
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        };
        let notes = notes.unwrap_or_default();

        let outcome = {
            let _guard = self.locks.lock(&rating_lock_key(&user_key, &spot_name)).await;
            let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

            upsert(
                self.gateway(),
                &ratings_range(),
                |row| RatingRow::is_for(row, &user_key, &spot_name),
                |existing| {
                    let notes = match existing {
                        Some(row) => format!("{}\n{}", cell(row, RATING_NOTES), notes),
                        None => notes,
                    };
                    RatingRow {
                        user_key: user_key.clone(),
                        spot_name: spot_name.clone(),
                        user_name,
                        crust: input_cell(&ratings.crust),
                        sauce: input_cell(&ratings.sauce),
                        cheese: input_cell(&ratings.cheese),
                        flavor: input_cell(&ratings.flavor),
                        notes,
                        updated_at,
                    }
                    .into_cells()
                },
            )
            .await?
        };
        info!("Rating from {user_key} for {spot_name}: {outcome:?}");

        if self.mark_ranked(&spot_name).await? == RankedOutcome::NotFound {
            warn!("Rated spot not in {}: {spot_name}", spots_range().sheet);
        }
        Ok(outcome)
    }

    /// Map `user_key` to `user_name`, replacing any previous name.
    pub async fn set_name(
        &self,
        user_key: &str,
        user_name: &str,
    ) -> Result<UpsertOutcome, GatewayError> {
        let _guard = self.locks.lock(&mapping_lock_key(user_key)).await;

        upsert(
            self.gateway(),
            &mapping_range(),
            |row| cell(row, MAPPING_USER_KEY) == user_key,
            |_| {
                UserMapping {
                    user_key: user_key.to_string(),
                    display_name: user_name.to_string(),
                }
                .into_cells()
            },
        )
        .await
    }

    /// Set the ranked cell of `spot_name`'s row. A missing spot is reported,
    /// not treated as a failure, and left to the caller to log.
    pub async fn mark_ranked(&self, spot_name: &str) -> Result<RankedOutcome, GatewayError> {
        let range = spots_range();
        let rows = self.gateway.get(&range).await?;

        let Some(idx) = position_by_key(data_rows(&rows), |row| cell(row, SPOT_NAME) == spot_name)
        else {
            return Ok(RankedOutcome::NotFound);
        };

        let row = sheet_row_number(idx);
        let target = SheetRange::cell(&range.sheet, SPOT_RANKED as u32 + 1, row);
        self.gateway
            .update(&target, vec![vec![RANKED_TRUE.to_string()]])
            .await?;
        Ok(RankedOutcome::Ranked { row })
    }
}
