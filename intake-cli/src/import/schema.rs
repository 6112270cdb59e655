//! Declarative import schemas
//!
//! A schema is an ordered list of column specs plus the rules the parser needs
//! to find the header: which columns anchor header detection, which columns
//! must be present in the header at all, and an optional preamble row.

use regex::Regex;

use crate::cell::CellValue;
use crate::dates::parse_date;

/// One declared column
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    /// Stable key used in parsed records
    pub key: &'static str,
    /// Header text as written in the template
    pub header: String,
    /// Case-insensitive patterns that also identify the column
    pub patterns: Vec<Regex>,
    /// Rows with this column blank are validation errors
    pub required: bool,
    /// Example text shipped in the template's sample row
    pub example: String,
    /// Position used when the header row is missing or lacks this column
    pub fallback_index: Option<usize>,
}

impl ColumnSpec {
    /// Create an optional column with no patterns
    pub fn new(key: &'static str, header: impl Into<String>) -> Self {
        ColumnSpec {
            key,
            header: header.into(),
            patterns: Vec::new(),
            required: false,
            example: String::new(),
            fallback_index: None,
        }
    }

    /// Add a header pattern (compiled case-insensitively)
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.patterns.push(Regex::new(&format!("(?i){}", pattern))?);
        Ok(self)
    }

    /// Mark the column as mandatory on every data row
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the template example text
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    /// Set the positional fallback
    pub fn fallback_index(mut self, index: usize) -> Self {
        self.fallback_index = Some(index);
        self
    }

    /// Check whether a header cell names this column
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim();
        if header.is_empty() {
            return false;
        }
        header.eq_ignore_ascii_case(self.header.trim())
            || self.patterns.iter().any(|p| p.is_match(header))
    }

    /// Check whether a raw value is the template's example text
    pub fn is_example(&self, value: &str) -> bool {
        !self.example.is_empty() && value.trim() == self.example.trim()
    }
}

/// Leading metadata row carrying a single value (e.g. a commencement date)
#[derive(Debug, Clone)]
pub struct PreambleRule {
    /// Keyword searched in the label cell (lower-case, whitespace removed)
    pub label_keyword: String,
}

impl PreambleRule {
    pub fn new(label_keyword: impl Into<String>) -> Self {
        PreambleRule {
            label_keyword: label_keyword.into(),
        }
    }

    /// Detect the preamble on the first row of a sheet
    ///
    /// A first cell that parses as a date is the value itself; a first cell that
    /// contains the label keyword puts the value in the next cell.
    pub fn detect(&self, row: &[CellValue]) -> Option<(Option<String>, CellValue)> {
        let first = row.first()?;
        if parse_date(first).is_some() {
            return Some((None, first.clone()));
        }

        let label: String = first
            .text()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if !self.label_keyword.is_empty() && label.contains(&self.label_keyword) {
            let value = row.get(1).cloned().unwrap_or_default();
            return Some((Some(first.text()), value));
        }

        None
    }
}

/// A complete import schema
#[derive(Debug, Clone)]
pub struct Schema {
    /// Human-readable schema name (used in errors)
    pub name: String,
    /// Columns in template order
    pub columns: Vec<ColumnSpec>,
    /// Columns whose header match identifies the header row
    pub anchor_keys: Vec<&'static str>,
    /// Columns that must be present in the header or the import fails
    pub hard_required: Vec<&'static str>,
    /// Optional leading preamble row
    pub preamble: Option<PreambleRule>,
}

impl Schema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Schema {
            name: name.into(),
            columns,
            anchor_keys: Vec::new(),
            hard_required: Vec::new(),
            preamble: None,
        }
    }

    pub fn with_anchors(mut self, keys: &[&'static str]) -> Self {
        self.anchor_keys = keys.to_vec();
        self
    }

    pub fn with_hard_required(mut self, keys: &[&'static str]) -> Self {
        self.hard_required = keys.to_vec();
        self
    }

    pub fn with_preamble(mut self, rule: PreambleRule) -> Self {
        self.preamble = Some(rule);
        self
    }

    /// Find a column by key
    pub fn column(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Declared headers in template order
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    /// Example row in template order
    pub fn examples(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.example.as_str()).collect()
    }

    /// Header text for a key, falling back to the key itself
    pub fn header_for(&self, key: &str) -> String {
        self.column(key)
            .map(|c| c.header.clone())
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_header_matching_exact_and_pattern() {
        let column = ColumnSpec::new("tag_no", "Tag No. *")
            .pattern(r"tag\s*no\.?")
            .unwrap();
        assert!(column.matches_header("Tag No. *"));
        assert!(column.matches_header("  tag no"));
        assert!(column.matches_header("TAGNO."));
        assert!(!column.matches_header("Job No."));
        assert!(!column.matches_header(""));
    }

    #[test]
    fn test_example_detection() {
        let column = ColumnSpec::new("job_no", "Job No. *").example("e.g., Job-2024-001");
        assert!(column.is_example(" e.g., Job-2024-001"));
        assert!(!column.is_example("Job-2024-001"));
        assert!(!ColumnSpec::new("x", "X").is_example(""));
    }

    #[test]
    fn test_preamble_detection() {
        let rule = PreambleRule::new("commencement");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let (label, value) = rule.detect(&[CellValue::Date(date)]).unwrap();
        assert!(label.is_none());
        assert_eq!(value, CellValue::Date(date));

        let (label, value) = rule
            .detect(&["Commencement Date".into(), "01-01-2024".into()])
            .unwrap();
        assert_eq!(label.as_deref(), Some("Commencement Date"));
        assert_eq!(value, CellValue::Text("01-01-2024".into()));

        assert!(rule.detect(&["Sr. No.".into(), "Activity Name".into()]).is_none());
        assert!(rule.detect(&[]).is_none());
    }
}
