use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::gateway::GatewayError;

lazy_static! {
    static ref RANGE_REGEX: Regex =
        Regex::new(r"^(.+)!([A-Za-z]+)([0-9]*)(?::([A-Za-z]+)([0-9]*))?$").unwrap();
}

/// An A1-notation range inside a named sheet.
///
/// Columns are 1-based and always bounded. Rows are 1-based and optional:
/// `Sheet1!A:I` spans every row, `Sheet1!A5:I5` a single row and
/// `PizzaSpots!E3` a single cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetRange {
    pub sheet: String,
    pub start_col: u32,
    pub end_col: u32,
    pub start_row: Option<u32>,
    pub end_row: Option<u32>,
}

impl SheetRange {
    /// Whole-column span, e.g. `columns("Sheet1", 1, 9)` is `Sheet1!A:I`.
    pub fn columns(sheet: &str, start_col: u32, end_col: u32) -> Self {
        SheetRange {
            sheet: sheet.to_string(),
            start_col,
            end_col,
            start_row: None,
            end_row: None,
        }
    }

    pub fn cell(sheet: &str, col: u32, row: u32) -> Self {
        SheetRange {
            sheet: sheet.to_string(),
            start_col: col,
            end_col: col,
            start_row: Some(row),
            end_row: Some(row),
        }
    }

    /// The same column span pinned to one absolute row.
    pub fn row_span(&self, row: u32) -> Self {
        SheetRange {
            sheet: self.sheet.clone(),
            start_col: self.start_col,
            end_col: self.end_col,
            start_row: Some(row),
            end_row: Some(row),
        }
    }

    pub fn width(&self) -> usize {
        (self.end_col - self.start_col + 1) as usize
    }

    /// Number of rows when both ends are pinned.
    pub fn height(&self) -> Option<usize> {
        match (self.start_row, self.end_row) {
            (Some(start), Some(end)) => Some((end - start + 1) as usize),
            _ => None,
        }
    }

    pub fn col_to_letter(col: u32) -> String {
        let mut col = col;
        let mut result = String::new();
        while col > 0 {
            col -= 1;
            result.push(((col % 26) as u8 + b'A') as char);
            col /= 26;
        }
        result.chars().rev().collect()
    }

    pub fn letter_to_col(letters: &str) -> Option<u32> {
        if letters.is_empty() {
            return None;
        }
        letters.chars().try_fold(0u32, |acc, c| {
            let c = c.to_ascii_uppercase();
            if !c.is_ascii_uppercase() {
                return None;
            }
            acc.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)
        })
    }

    fn parse_row(digits: Option<&str>) -> Result<Option<u32>, ()> {
        match digits {
            None | Some("") => Ok(None),
            Some(digits) => match digits.parse::<u32>() {
                Ok(0) | Err(_) => Err(()),
                Ok(row) => Ok(Some(row)),
            },
        }
    }
}

impl FromStr for SheetRange {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GatewayError::InvalidRange(s.to_string());
        let caps = RANGE_REGEX.captures(s.trim()).ok_or_else(invalid)?;

        let sheet = caps[1].trim_matches('\'').to_string();
        if sheet.is_empty() {
            return Err(invalid());
        }

        let start_col = Self::letter_to_col(&caps[2]).ok_or_else(invalid)?;
        let start_row = Self::parse_row(caps.get(3).map(|m| m.as_str())).map_err(|_| invalid())?;

        let (end_col, end_row) = match caps.get(4) {
            Some(end_letters) => {
                let end_col = Self::letter_to_col(end_letters.as_str()).ok_or_else(invalid)?;
                let end_row =
                    Self::parse_row(caps.get(5).map(|m| m.as_str())).map_err(|_| invalid())?;
                (end_col, end_row)
            }
            // A lone cell reference pins both ends to the same cell.
            None => (start_col, start_row),
        };

        if end_col < start_col {
            return Err(invalid());
        }
        if let (Some(start), Some(end)) = (start_row, end_row) {
            if end < start {
                return Err(invalid());
            }
        }

        Ok(SheetRange {
            sheet,
            start_col,
            end_col,
            start_row,
            end_row,
        })
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = Self::col_to_letter(self.start_col);
        let end = Self::col_to_letter(self.end_col);
        let row = |r: Option<u32>| r.map(|r| r.to_string()).unwrap_or_default();

        if self.start_col == self.end_col && self.start_row.is_some() && self.start_row == self.end_row
        {
            return write!(f, "{}!{}{}", self.sheet, start, row(self.start_row));
        }
        write!(
            f,
            "{}!{}{}:{}{}",
            self.sheet,
            start,
            row(self.start_row),
            end,
            row(self.end_row)
        )
    }
}
