use std::collections::HashMap;

use serde::Serialize;

use crate::gateway::{GatewayError, Row};
use crate::rows::{RatingRow, data_rows, ratings_range};
use crate::score::{AGGREGATE_MISSING_SCORE, score_or};
use crate::service::RankingService;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub spot_name: String,
    pub average_score: f64,
    pub average_crust: f64,
    pub average_sauce: f64,
    pub average_cheese: f64,
    pub average_overall_flavor: f64,
}

#[derive(Default)]
struct Totals {
    count: u32,
    crust: f64,
    sauce: f64,
    cheese: f64,
    flavor: f64,
}

/// Round to one decimal place, deciding on the exact binary value the way
/// fixed-point formatting does. Only exact halves round away from zero, so
/// `169.0 / 20.0` (just under 8.45) gives 8.4.
pub fn round_tenths(value: f64) -> f64 {
    let scaled = value * 10.0;
    let mut rounded = scaled.round();

    if (rounded - scaled).abs() == 0.5 {
        // The product may have been rounded onto the half; the fused
        // multiply-add recovers which side the exact product was on.
        let error = value.mul_add(10.0, -scaled);
        if error > 0.0 {
            rounded = scaled.ceil();
        } else if error < 0.0 {
            rounded = scaled.floor();
        }
    }
    rounded / 10.0
}

/// Group header-stripped rating rows by spot and average them, best first.
///
/// `average_score` is the mean of the four-score sum per rating. Spots with
/// equal scores stay in the order they first appear in `rows`.
pub fn aggregate(rows: &[Row]) -> Vec<LeaderboardEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, Totals> = HashMap::new();

    for row in rows {
        let rating = RatingRow::from_cells(row);
        let entry = totals.entry(rating.spot_name.clone()).or_insert_with(|| {
            order.push(rating.spot_name.clone());
            Totals::default()
        });
        entry.count += 1;
        entry.crust += score_or(&rating.crust, AGGREGATE_MISSING_SCORE);
        entry.sauce += score_or(&rating.sauce, AGGREGATE_MISSING_SCORE);
        entry.cheese += score_or(&rating.cheese, AGGREGATE_MISSING_SCORE);
        entry.flavor += score_or(&rating.flavor, AGGREGATE_MISSING_SCORE);
    }

    let mut leaderboard: Vec<LeaderboardEntry> = order
        .into_iter()
        .filter_map(|spot_name| {
            let t = totals.remove(&spot_name)?;
            let n = f64::from(t.count);
            Some(LeaderboardEntry {
                average_score: round_tenths((t.crust + t.sauce + t.cheese + t.flavor) / n),
                average_crust: round_tenths(t.crust / n),
                average_sauce: round_tenths(t.sauce / n),
                average_cheese: round_tenths(t.cheese / n),
                average_overall_flavor: round_tenths(t.flavor / n),
                spot_name,
            })
        })
        .collect();

    leaderboard.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));
    leaderboard
}

impl RankingService {
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, GatewayError> {
        let rows = self.gateway.get(&ratings_range()).await?;
        Ok(aggregate(data_rows(&rows)))
    }
}
