//! Score coercion.
//!
//! Cells hold text, so every score goes through [`score_or`] before any
//! arithmetic. Unparsable, missing and zero scores fall back to a default
//! that depends on the caller.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Substituted for unusable scores when averaging the leaderboard.
pub const AGGREGATE_MISSING_SCORE: f64 = 0.0;

/// Substituted for unusable scores when returning a single stored rating.
pub const LOOKUP_MISSING_SCORE: f64 = 5.0;

lazy_static! {
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").unwrap();
}

/// Longest numeric prefix of `text`, ignoring leading whitespace.
///
/// `"7.5 (great)"` gives `Some(7.5)`, `"n/a"` gives `None`.
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let m = LEADING_NUMBER.find(text.trim_start())?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parsed score, or `default` when the cell is empty, non-numeric or zero.
pub fn score_or(text: &str, default: f64) -> f64 {
    match parse_leading_number(text) {
        Some(value) if value != 0.0 => value,
        _ => default,
    }
}

/// A score as submitted by a client: JSON number or free text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreInput {
    Number(f64),
    Text(String),
}

impl ScoreInput {
    pub fn to_cell(&self) -> String {
        match self {
            ScoreInput::Number(n) => n.to_string(),
            ScoreInput::Text(s) => s.clone(),
        }
    }
}

pub fn input_cell(input: &Option<ScoreInput>) -> String {
    input.as_ref().map(ScoreInput::to_cell).unwrap_or_default()
}
