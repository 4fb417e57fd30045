use std::error::Error;
use std::fs;
use std::path::Path;

use log::info;

use crate::gateway::{Row, SheetGateway};
use crate::rows::{data_rows, spots_range};

/// Read a CSV file into rows of cells, header line included.
///
/// Blank lines are skipped. Quoted fields may contain commas and line
/// breaks, and a doubled quote inside a quoted field stands for one quote
/// character.
///
/// # Examples
/// ```no_run
/// use pizza_ranking::loader::from_csv;
///
/// match from_csv("spots.csv") {
///     Ok(rows) => println!("Read {} rows", rows.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Vec<Row>, Box<dyn Error + Send + Sync>> {
    let text = fs::read_to_string(filepath)?;

    let rows = parse_csv(&text);
    if rows.is_empty() {
        return Err("CSV file is empty".into());
    }
    Ok(rows)
}

/// Fill the spots sheet from a CSV file when it has no data rows yet.
///
/// The CSV's first line is treated as a header and skipped. Returns the
/// number of spots written.
pub async fn seed_spots(
    gateway: &dyn SheetGateway,
    filepath: impl AsRef<Path>,
) -> Result<usize, Box<dyn Error + Send + Sync>> {
    let range = spots_range();
    let existing = gateway.get(&range).await?;
    if !data_rows(&existing).is_empty() {
        info!("{} already has data, skipping seed", range.sheet);
        return Ok(0);
    }

    let rows = from_csv(filepath)?;
    let spots: Vec<Row> = data_rows(&rows)
        .iter()
        .map(|row| row.iter().take(range.width()).cloned().collect())
        .collect();
    let count = spots.len();
    if count > 0 {
        gateway.append(&range, spots).await?;
    }
    Ok(count)
}

// Parse CSV text into rows. Record breaks only count outside quotes.
fn parse_csv(text: &str) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut row: Row = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Double quote inside quoted field - add a single quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                row.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut current_field));
                push_record(&mut rows, std::mem::take(&mut row));
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    row.push(current_field);
    push_record(&mut rows, row);
    rows
}

fn push_record(rows: &mut Vec<Row>, row: Row) {
    let blank = row.len() == 1 && row[0].trim().is_empty();
    if !blank {
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{Workbook, WorkbookGateway};
    use std::io::Write;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let rows = parse_csv(r#"Joe's,"12 Main St, Brooklyn","The ""classic"" slice""#);
        assert_eq!(rows, vec![vec!["Joe's", "12 Main St, Brooklyn", "The \"classic\" slice"]]);
    }

    #[test]
    fn empty_fields_are_preserved() {
        assert_eq!(parse_csv("a,,c,"), vec![vec!["a", "", "c", ""]]);
    }

    #[test]
    fn quoted_line_breaks_stay_in_the_field() {
        let text = "Name,Address,Description\r\nLucali,575 Henry St,\"Candlelit.\r\nCash only.\"\r\n\r\nJoe's,7 Carmine St,Slice\n";
        let rows = parse_csv(text);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["Lucali", "575 Henry St", "Candlelit.\r\nCash only."]);
        assert_eq!(rows[2], vec!["Joe's", "7 Carmine St", "Slice"]);
    }

    #[tokio::test]
    async fn seeds_spots_only_once() {
        let mut csv = tempfile::NamedTempFile::new().unwrap();
        writeln!(csv, "Name,Address,Description").unwrap();
        writeln!(csv, "Joe's,\"7 Carmine St\",Classic slice").unwrap();
        writeln!(csv).unwrap();
        writeln!(csv, "L&B,2725 86th St,Square pie").unwrap();

        let gateway = WorkbookGateway::in_memory(Workbook::bootstrap());
        assert_eq!(seed_spots(&gateway, csv.path()).await.unwrap(), 2);
        assert_eq!(seed_spots(&gateway, csv.path()).await.unwrap(), 0);

        let rows = gateway.get(&spots_range()).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["Joe's", "7 Carmine St", "Classic slice"]);
    }
}
