//! Raw spreadsheet cell values
//!
//! A sheet is handed to the import parser as rows of `CellValue`, in sheet
//! order. Cells keep the shape the file reader produced (text, number, native
//! date) so the date normalizer can tell a serial number from typed text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single raw cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    /// Empty cell (or a cell the reader could not represent)
    #[default]
    Empty,
    /// Text as typed
    Text(String),
    /// Numeric cell; spreadsheet dates arrive here as serial day numbers
    Number(f64),
    /// Boolean cell
    Bool(bool),
    /// Native calendar date
    Date(NaiveDate),
}

/// One row of raw cells
pub type RawRow = Vec<CellValue>;

impl CellValue {
    /// Trimmed display text of the cell
    ///
    /// Whole numbers render without a fractional part so `1.0` reads as `"1"`.
    pub fn text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => crate::dates::format_date(*d),
        }
    }

    /// True when the cell carries no visible content
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Numeric value of the cell, if it is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        String::new()
    } else if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<&calamine::Data> for CellValue {
    fn from(cell: &calamine::Data) -> Self {
        use calamine::Data;
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::from(s.as_str()),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            // Date cells keep their serial so they go through the same day arithmetic
            // as plain numeric cells
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) => CellValue::Empty,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}
