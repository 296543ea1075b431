//! Spreadsheets: a bounded grid of text cells addressed in A1 notation.
//!
//! Cells are stored sparsely as a map from canonical address (`"B7"`) to the
//! raw value. Values are plain text; there is no formula evaluation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{MAX_SHEET_COLS, MAX_SHEET_ROWS};
use crate::errors::{AppError, AppResult};

static A1_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]{1,3})([1-9][0-9]{0,6})$").expect("valid A1 regex"));

/// Sparse cell storage keyed by canonical A1 address
pub type Cells = BTreeMap<String, String>;

/// Zero-based cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Column letters for a zero-based index: 0 → A, 25 → Z, 26 → AA.
    pub fn column_label(col: u32) -> String {
        let mut n = col + 1;
        let mut label = Vec::new();
        while n > 0 {
            let rem = ((n - 1) % 26) as u8;
            label.push(b'A' + rem);
            n = (n - 1) / 26;
        }
        label.reverse();
        String::from_utf8(label).unwrap_or_default()
    }

    pub fn within(&self, rows: i32, cols: i32) -> bool {
        i64::from(self.row) < i64::from(rows) && i64::from(self.col) < i64::from(cols)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_label(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = A1_PATTERN
            .captures(s.trim())
            .ok_or_else(|| AppError::validation(format!("Invalid cell address '{}'", s)))?;

        let col = caps[1]
            .to_ascii_uppercase()
            .bytes()
            .fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A' + 1))
            - 1;
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| AppError::validation(format!("Invalid cell address '{}'", s)))?;

        Ok(Self { row: row - 1, col })
    }
}

/// Spreadsheet document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Spreadsheet {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub rows: i32,
    pub cols: i32,
    #[schema(value_type = Object, example = json!({"A1": "Region", "B1": "Revenue"}))]
    pub cells: Cells,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single cell write; an empty value clears the cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CellUpdate {
    #[schema(example = "B2")]
    pub address: String,
    pub value: String,
}

/// Check a grid size against the sheet limits.
pub fn validate_dimensions(rows: i32, cols: i32) -> AppResult<()> {
    if !(1..=MAX_SHEET_ROWS).contains(&rows) {
        return Err(AppError::validation(format!(
            "Rows must be between 1 and {}",
            MAX_SHEET_ROWS
        )));
    }
    if !(1..=MAX_SHEET_COLS).contains(&cols) {
        return Err(AppError::validation(format!(
            "Columns must be between 1 and {}",
            MAX_SHEET_COLS
        )));
    }
    Ok(())
}

impl Spreadsheet {
    /// Apply a batch of writes. The batch is all-or-nothing: any invalid
    /// address rejects the whole batch and leaves the sheet untouched.
    pub fn set_cells(&mut self, updates: &[CellUpdate]) -> AppResult<()> {
        let mut parsed = Vec::with_capacity(updates.len());
        for update in updates {
            let address: CellAddress = update.address.parse()?;
            if !address.within(self.rows, self.cols) {
                return Err(AppError::validation(format!(
                    "Cell {} is outside the {}x{} grid",
                    address, self.rows, self.cols
                )));
            }
            parsed.push((address, update.value.as_str()));
        }

        for (address, value) in parsed {
            if value.is_empty() {
                self.cells.remove(&address.to_string());
            } else {
                self.cells.insert(address.to_string(), value.to_string());
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Change the grid size, dropping cells that fall outside it.
    pub fn resize(&mut self, rows: i32, cols: i32) -> AppResult<()> {
        validate_dimensions(rows, cols)?;
        self.cells.retain(|key, _| {
            key.parse::<CellAddress>()
                .map(|address| address.within(rows, cols))
                .unwrap_or(false)
        });
        self.rows = rows;
        self.cols = cols;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cell(&self, address: CellAddress) -> Option<&str> {
        self.cells.get(&address.to_string()).map(String::as_str)
    }

    /// Render the used area as RFC 4180 CSV.
    ///
    /// Only rows and columns up to the last non-empty cell are emitted.
    pub fn to_csv(&self) -> String {
        let addresses: Vec<CellAddress> =
            self.cells.keys().filter_map(|k| k.parse().ok()).collect();
        let (Some(max_row), Some(max_col)) = (
            addresses.iter().map(|a| a.row).max(),
            addresses.iter().map(|a| a.col).max(),
        ) else {
            return String::new();
        };

        let mut out = String::new();
        for row in 0..=max_row {
            let line: Vec<String> = (0..=max_col)
                .map(|col| escape_csv(self.cell(CellAddress::new(row, col)).unwrap_or("")))
                .collect();
            out.push_str(&line.join(","));
            out.push_str("\r\n");
        }
        out
    }
}

fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: i32, cols: i32) -> Spreadsheet {
        Spreadsheet {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Budget".into(),
            rows,
            cols,
            cells: Cells::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn write(address: &str, value: &str) -> CellUpdate {
        CellUpdate {
            address: address.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_parse_a1() {
        assert_eq!("A1".parse::<CellAddress>().unwrap(), CellAddress::new(0, 0));
        assert_eq!("z10".parse::<CellAddress>().unwrap(), CellAddress::new(9, 25));
        assert_eq!("AA1".parse::<CellAddress>().unwrap(), CellAddress::new(0, 26));
        assert_eq!("AB12".parse::<CellAddress>().unwrap(), CellAddress::new(11, 27));
        assert!("A0".parse::<CellAddress>().is_err());
        assert!("1A".parse::<CellAddress>().is_err());
        assert!("".parse::<CellAddress>().is_err());
    }

    #[test]
    fn test_column_labels() {
        assert_eq!(CellAddress::column_label(0), "A");
        assert_eq!(CellAddress::column_label(25), "Z");
        assert_eq!(CellAddress::column_label(26), "AA");
        assert_eq!(CellAddress::column_label(701), "ZZ");
        assert_eq!(CellAddress::new(11, 27).to_string(), "AB12");
    }

    #[test]
    fn test_set_cells_canonicalizes_and_clears() {
        let mut s = sheet(10, 5);
        s.set_cells(&[write("b2", "42"), write("A1", "x")]).unwrap();
        assert_eq!(s.cell(CellAddress::new(1, 1)), Some("42"));

        s.set_cells(&[write("B2", "")]).unwrap();
        assert_eq!(s.cell(CellAddress::new(1, 1)), None);
        assert_eq!(s.cells.len(), 1);
    }

    #[test]
    fn test_out_of_bounds_rejects_whole_batch() {
        let mut s = sheet(2, 2);
        let result = s.set_cells(&[write("A1", "ok"), write("C1", "nope")]);
        assert!(result.is_err());
        assert!(s.cells.is_empty());
    }

    #[test]
    fn test_resize_drops_cells() {
        let mut s = sheet(5, 5);
        s.set_cells(&[write("A1", "keep"), write("E5", "drop")]).unwrap();
        s.resize(3, 3).unwrap();
        assert_eq!(s.cells.len(), 1);
        assert!(s.resize(0, 3).is_err());
        assert!(s.resize(3, MAX_SHEET_COLS + 1).is_err());
    }

    #[test]
    fn test_csv_export_escapes() {
        let mut s = sheet(5, 5);
        s.set_cells(&[
            write("A1", "name"),
            write("B1", "note"),
            write("A2", "Smith, J"),
            write("B2", "said \"hi\""),
        ])
        .unwrap();
        assert_eq!(
            s.to_csv(),
            "name,note\r\n\"Smith, J\",\"said \"\"hi\"\"\"\r\n"
        );
        assert_eq!(sheet(1, 1).to_csv(), "");
    }

    #[test]
    fn test_csv_fills_gaps() {
        let mut s = sheet(5, 5);
        s.set_cells(&[write("C2", "z")]).unwrap();
        assert_eq!(s.to_csv(), ",,\r\n,,z\r\n");
    }
}
