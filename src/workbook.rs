//! In-process spreadsheet store.
//!
//! A [`Workbook`] is an ordered list of named sheets, each a list of rows of
//! string cells. [`WorkbookGateway`] puts one behind a mutex and implements
//! [`SheetGateway`] on it, saving to disk after every write when a path is
//! configured.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::gateway::{GatewayError, Row, SheetGateway};
use crate::range::SheetRange;
use crate::rows::{
    MAPPING_HEADER, MAPPING_SHEET, RATINGS_HEADER, RATINGS_SHEET, SPOTS_HEADER, SPOTS_SHEET,
};
use crate::saving;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A workbook holding the ratings, spots and mapping sheets with headers.
    pub fn bootstrap() -> Self {
        let mut workbook = Workbook::new();
        workbook.ensure_default_sheets();
        workbook
    }

    pub fn ensure_default_sheets(&mut self) {
        self.ensure_sheet(RATINGS_SHEET, &RATINGS_HEADER);
        self.ensure_sheet(SPOTS_SHEET, &SPOTS_HEADER);
        self.ensure_sheet(MAPPING_SHEET, &MAPPING_HEADER);
    }

    /// Add `name` with a header row unless it already exists.
    /// Returns true when the sheet was created.
    pub fn ensure_sheet(&mut self, name: &str, header: &[&str]) -> bool {
        if self.sheet(name).is_some() {
            return false;
        }
        self.sheets.push(Sheet {
            name: name.to_string(),
            rows: vec![header.iter().map(|h| h.to_string()).collect()],
        });
        true
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet, GatewayError> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| GatewayError::SheetNotFound(name.to_string()))
    }

    /// Rows inside `range`, clipped to its columns. Trailing empty cells and
    /// trailing empty rows are dropped.
    pub fn read(&self, range: &SheetRange) -> Result<Vec<Row>, GatewayError> {
        let sheet = self
            .sheet(&range.sheet)
            .ok_or_else(|| GatewayError::SheetNotFound(range.sheet.clone()))?;

        let first = range.start_row.unwrap_or(1) as usize;
        let last = range
            .end_row
            .map(|r| r as usize)
            .unwrap_or(sheet.rows.len())
            .min(sheet.rows.len());

        let mut out: Vec<Row> = Vec::new();
        for row in sheet.rows.iter().take(last).skip(first.saturating_sub(1)) {
            out.push(clip(row, range));
        }
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    /// Overwrite cells from the top-left corner of `range`.
    pub fn write(&mut self, range: &SheetRange, values: Vec<Row>) -> Result<(), GatewayError> {
        let fits_height = range.height().is_none_or(|h| values.len() <= h);
        let fits_width = values.iter().all(|row| row.len() <= range.width());
        if !fits_height || !fits_width {
            return Err(GatewayError::OutOfRange(range.to_string()));
        }

        let start_row = range.start_row.unwrap_or(1) as usize;
        let start_col = range.start_col as usize;
        let sheet = self.sheet_mut(&range.sheet)?;

        for (i, values_row) in values.into_iter().enumerate() {
            let row_idx = start_row - 1 + i;
            if sheet.rows.len() <= row_idx {
                sheet.rows.resize_with(row_idx + 1, Vec::new);
            }
            let row = &mut sheet.rows[row_idx];
            for (j, value) in values_row.into_iter().enumerate() {
                let col_idx = start_col - 1 + j;
                if row.len() <= col_idx {
                    row.resize(col_idx + 1, String::new());
                }
                row[col_idx] = value;
            }
        }
        Ok(())
    }

    /// Write `values` on the row after the last one with data in `range`'s
    /// columns.
    pub fn append(&mut self, range: &SheetRange, values: Vec<Row>) -> Result<(), GatewayError> {
        let sheet = self
            .sheet(&range.sheet)
            .ok_or_else(|| GatewayError::SheetNotFound(range.sheet.clone()))?;

        let occupied = sheet
            .rows
            .iter()
            .rposition(|row| !clip(row, range).is_empty())
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let next_row = occupied.max(range.start_row.unwrap_or(1) as usize - 1) + 1;

        let target = SheetRange {
            sheet: range.sheet.clone(),
            start_col: range.start_col,
            end_col: range.end_col,
            start_row: Some(next_row as u32),
            end_row: None,
        };
        self.write(&target, values)
    }
}

fn clip(row: &[String], range: &SheetRange) -> Row {
    let start = (range.start_col - 1) as usize;
    let end = (range.end_col as usize).min(row.len());
    let mut cells: Row = row.get(start..end).map(|c| c.to_vec()).unwrap_or_default();
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}

/// [`SheetGateway`] over a [`Workbook`], optionally persisted to a file.
///
/// Writes, including the file rewrite, run on tokio's blocking pool so a
/// slow disk never stalls the request workers.
pub struct WorkbookGateway {
    workbook: Arc<Mutex<Workbook>>,
    path: Option<PathBuf>,
}

impl WorkbookGateway {
    pub fn in_memory(workbook: Workbook) -> Self {
        WorkbookGateway {
            workbook: Arc::new(Mutex::new(workbook)),
            path: None,
        }
    }

    /// Load the workbook at `path`, or bootstrap a fresh one there.
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        let mut workbook = if path.exists() {
            info!("Loading workbook from {}", path.display());
            saving::load_workbook(path)?
        } else {
            info!("Creating workbook at {}", path.display());
            Workbook::new()
        };
        workbook.ensure_default_sheets();
        saving::save_workbook(&workbook, path)?;

        Ok(WorkbookGateway {
            workbook: Arc::new(Mutex::new(workbook)),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn snapshot(&self) -> Result<Workbook, GatewayError> {
        let workbook = self.workbook.lock().map_err(|_| GatewayError::Poisoned)?;
        Ok(workbook.clone())
    }

    async fn mutate(
        &self,
        f: impl FnOnce(&mut Workbook) -> Result<(), GatewayError> + Send + 'static,
    ) -> Result<(), GatewayError> {
        let workbook = Arc::clone(&self.workbook);
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), GatewayError> {
            let mut workbook = workbook.lock().map_err(|_| GatewayError::Poisoned)?;
            f(&mut workbook)?;
            if let Some(path) = &path {
                saving::save_workbook(&workbook, path)?;
            }
            Ok(())
        })
        .await?
    }
}

#[async_trait]
impl SheetGateway for WorkbookGateway {
    async fn get(&self, range: &SheetRange) -> Result<Vec<Row>, GatewayError> {
        let workbook = self.workbook.lock().map_err(|_| GatewayError::Poisoned)?;
        workbook.read(range)
    }

    async fn update(&self, range: &SheetRange, values: Vec<Row>) -> Result<(), GatewayError> {
        debug!("update {range} ({} row(s))", values.len());
        let range = range.clone();
        self.mutate(move |workbook| workbook.write(&range, values))
            .await
    }

    async fn append(&self, range: &SheetRange, values: Vec<Row>) -> Result<(), GatewayError> {
        debug!("append {range} ({} row(s))", values.len());
        let range = range.clone();
        self.mutate(move |workbook| workbook.append(&range, values))
            .await
    }
}
