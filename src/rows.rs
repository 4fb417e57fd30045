use crate::gateway::Row;
use crate::range::SheetRange;

pub const RATINGS_SHEET: &str = "Sheet1";
pub const SPOTS_SHEET: &str = "PizzaSpots";
pub const MAPPING_SHEET: &str = "UserMapping";

pub const RATINGS_HEADER: [&str; 9] = [
    "UID", "Spot", "User", "Crust", "Sauce", "Cheese", "Flavor", "Notes", "Timestamp",
];
pub const SPOTS_HEADER: [&str; 5] = ["Name", "Address", "Description", "Image", "Ranked"];
pub const MAPPING_HEADER: [&str; 2] = ["UID", "Name"];

/// Display name stored with a rating when the user never set one.
pub const UNKNOWN_USER: &str = "Unknown User";
/// Name registered the first time an unseen user key asks for its name.
pub const PLACEHOLDER_NAME: &str = "Click to Edit Name";
pub const RANKED_TRUE: &str = "TRUE";

// Rating columns (Sheet1!A:I)
pub const RATING_USER_KEY: usize = 0;
pub const RATING_SPOT: usize = 1;
pub const RATING_USER_NAME: usize = 2;
pub const RATING_CRUST: usize = 3;
pub const RATING_SAUCE: usize = 4;
pub const RATING_CHEESE: usize = 5;
pub const RATING_FLAVOR: usize = 6;
pub const RATING_NOTES: usize = 7;
pub const RATING_UPDATED_AT: usize = 8;

// Spot columns (PizzaSpots!A:E)
pub const SPOT_NAME: usize = 0;
pub const SPOT_ADDRESS: usize = 1;
pub const SPOT_DESCRIPTION: usize = 2;
pub const SPOT_RANKED: usize = 4;

// Mapping columns (UserMapping!A:B)
pub const MAPPING_USER_KEY: usize = 0;
pub const MAPPING_NAME: usize = 1;

pub fn ratings_range() -> SheetRange {
    SheetRange::columns(RATINGS_SHEET, 1, RATINGS_HEADER.len() as u32)
}

pub fn spots_range() -> SheetRange {
    SheetRange::columns(SPOTS_SHEET, 1, SPOTS_HEADER.len() as u32)
}

pub fn mapping_range() -> SheetRange {
    SheetRange::columns(MAPPING_SHEET, 1, MAPPING_HEADER.len() as u32)
}

/// Cell text at `idx`, empty when the row is shorter.
pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// 1-based sheet row of the data row at `data_index`, counting the header.
pub fn sheet_row_number(data_index: usize) -> u32 {
    data_index as u32 + 2
}

/// Every row except the header.
pub fn data_rows(rows: &[Row]) -> &[Row] {
    rows.get(1..).unwrap_or(&[])
}

#[derive(Clone, Debug, PartialEq)]
pub struct RatingRow {
    pub user_key: String,
    pub spot_name: String,
    pub user_name: String,
    pub crust: String,
    pub sauce: String,
    pub cheese: String,
    pub flavor: String,
    pub notes: String,
    pub updated_at: String,
}

impl RatingRow {
    pub fn from_cells(row: &[String]) -> Self {
        RatingRow {
            user_key: cell(row, RATING_USER_KEY).to_string(),
            spot_name: cell(row, RATING_SPOT).to_string(),
            user_name: cell(row, RATING_USER_NAME).to_string(),
            crust: cell(row, RATING_CRUST).to_string(),
            sauce: cell(row, RATING_SAUCE).to_string(),
            cheese: cell(row, RATING_CHEESE).to_string(),
            flavor: cell(row, RATING_FLAVOR).to_string(),
            notes: cell(row, RATING_NOTES).to_string(),
            updated_at: cell(row, RATING_UPDATED_AT).to_string(),
        }
    }

    pub fn into_cells(self) -> Row {
        vec![
            self.user_key,
            self.spot_name,
            self.user_name,
            self.crust,
            self.sauce,
            self.cheese,
            self.flavor,
            self.notes,
            self.updated_at,
        ]
    }

    pub fn is_for(row: &[String], user_key: &str, spot_name: &str) -> bool {
        cell(row, RATING_USER_KEY) == user_key && cell(row, RATING_SPOT) == spot_name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpotRow {
    pub spot_name: String,
    pub address: String,
    pub description: String,
    pub ranked: bool,
}

impl SpotRow {
    pub fn from_cells(row: &[String]) -> Self {
        SpotRow {
            spot_name: cell(row, SPOT_NAME).to_string(),
            address: cell(row, SPOT_ADDRESS).to_string(),
            description: cell(row, SPOT_DESCRIPTION).to_string(),
            ranked: cell(row, SPOT_RANKED).eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UserMapping {
    pub user_key: String,
    pub display_name: String,
}

impl UserMapping {
    pub fn from_cells(row: &[String]) -> Self {
        UserMapping {
            user_key: cell(row, MAPPING_USER_KEY).to_string(),
            display_name: cell(row, MAPPING_NAME).to_string(),
        }
    }

    pub fn into_cells(self) -> Row {
        vec![self.user_key, self.display_name]
    }
}
