//! The tabular store seam.
//!
//! Every engine talks to the store through [`SheetGateway`] only: read a
//! range, overwrite a range, append below a range. Rows come back as plain
//! string cells, header row included, with trailing empty cells trimmed.

use async_trait::async_trait;
use thiserror::Error;

use crate::range::SheetRange;

pub type Row = Vec<String>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Unable to parse range: {0}")]
    InvalidRange(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Values do not fit inside {0}")]
    OutOfRange(String),

    #[error("Workbook storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook lock poisoned")]
    Poisoned,

    #[error("Workbook write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait SheetGateway: Send + Sync {
    /// All rows inside `range`.
    async fn get(&self, range: &SheetRange) -> Result<Vec<Row>, GatewayError>;

    /// Overwrite cells starting at the top-left corner of `range`.
    async fn update(&self, range: &SheetRange, values: Vec<Row>) -> Result<(), GatewayError>;

    /// Write `values` below the last occupied row of `range`.
    async fn append(&self, range: &SheetRange, values: Vec<Row>) -> Result<(), GatewayError>;
}
