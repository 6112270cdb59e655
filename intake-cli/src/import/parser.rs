//! Tabular import parser
//!
//! Turns loosely structured sheet rows into typed records:
//! 1. detect an optional preamble row
//! 2. locate the header within a bounded window after the preamble
//! 3. map columns by header text, falling back to declared positions
//! 4. drop template example rows and blank rows, record rows missing
//!    mandatory values as errors without aborting the parse

use std::collections::HashMap;

use serde::Serialize;

use super::schema::Schema;
use crate::cell::CellValue;

/// Default number of rows searched for the header after the preamble
pub const DEFAULT_HEADER_SCAN_WINDOW: usize = 3;

/// Parser options
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Rows searched for the header, starting right after the preamble
    pub header_scan_window: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            header_scan_window: DEFAULT_HEADER_SCAN_WINDOW,
        }
    }
}

/// A data row that survived filtering and validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularRecord {
    /// Zero-based row index in the sheet
    pub row_index: usize,
    /// Column key -> raw value, in schema order
    pub values: Vec<(String, CellValue)>,
}

impl TabularRecord {
    /// Raw value for a column key
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Trimmed text for a column key (empty when absent)
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(|v| v.text()).unwrap_or_default()
    }
}

/// A row skipped because mandatory values were blank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// Zero-based row index in the sheet
    pub row_index: usize,
    /// Headers of the blank mandatory columns
    pub missing: Vec<String>,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Row {}: missing {}",
            self.row_index + 1,
            self.missing.join(", ")
        )
    }
}

/// The import cannot proceed: mandatory columns are absent from the header
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    pub schema: String,
    pub missing: Vec<String>,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} template must include columns: {}",
            self.schema,
            self.missing.join(", ")
        )
    }
}

impl std::error::Error for SchemaError {}

/// Preamble row found before the header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preamble {
    pub row_index: usize,
    pub label: Option<String>,
    pub value: CellValue,
}

/// Everything the parser learned about a sheet
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutput {
    pub preamble: Option<Preamble>,
    /// Row index of the detected header (None when positions were assumed)
    pub header_row: Option<usize>,
    /// First row read as data
    pub data_start_row: usize,
    /// Column key -> sheet column index, for columns that were located
    pub column_map: HashMap<String, usize>,
    pub records: Vec<TabularRecord>,
    /// Rows rejected by validation
    pub skipped_count: usize,
    /// Example and blank rows dropped silently
    pub placeholder_count: usize,
    pub errors: Vec<RowError>,
}

/// Parse rows with default options
pub fn parse(rows: &[Vec<CellValue>], schema: &Schema) -> Result<ParseOutput, SchemaError> {
    parse_with(rows, schema, &ParseOptions::default())
}

/// Parse rows against a schema
pub fn parse_with(
    rows: &[Vec<CellValue>],
    schema: &Schema,
    options: &ParseOptions,
) -> Result<ParseOutput, SchemaError> {
    // Sheets may carry blank rows above the used range
    let first_row = rows
        .iter()
        .position(|row| !row.iter().all(CellValue::is_blank))
        .unwrap_or(0);

    let preamble = schema.preamble.as_ref().and_then(|rule| {
        rows.get(first_row)
            .and_then(|row| rule.detect(row))
            .map(|(label, value)| Preamble {
                row_index: first_row,
                label,
                value,
            })
    });
    let start = if preamble.is_some() { first_row + 1 } else { first_row };

    let (header_row, column_map) = match find_header(rows, schema, start, options) {
        Some((row_idx, map)) => {
            let missing: Vec<String> = schema
                .hard_required
                .iter()
                .filter(|key| !map.contains_key(**key))
                .map(|key| schema.header_for(key))
                .collect();
            if !missing.is_empty() {
                return Err(SchemaError {
                    schema: schema.name.clone(),
                    missing,
                });
            }
            (Some(row_idx), map)
        }
        None => {
            if !schema.hard_required.is_empty() {
                return Err(SchemaError {
                    schema: schema.name.clone(),
                    missing: schema
                        .hard_required
                        .iter()
                        .map(|key| schema.header_for(key))
                        .collect(),
                });
            }
            log::debug!(
                "{}: no header row within {} rows of row {}, using declared column order",
                schema.name,
                options.header_scan_window,
                start
            );
            let map = schema
                .columns
                .iter()
                .filter_map(|c| c.fallback_index.map(|idx| (c.key.to_string(), idx)))
                .collect();
            (None, map)
        }
    };

    let data_start_row = header_row.map(|r| r + 1).unwrap_or(start);

    let mut output = ParseOutput {
        preamble,
        header_row,
        data_start_row,
        column_map,
        records: Vec::new(),
        skipped_count: 0,
        placeholder_count: 0,
        errors: Vec::new(),
    };

    for (row_index, row) in rows.iter().enumerate().skip(data_start_row) {
        let values: Vec<(String, CellValue)> = schema
            .columns
            .iter()
            .map(|column| {
                let value = output
                    .column_map
                    .get(column.key)
                    .and_then(|idx| row.get(*idx))
                    .cloned()
                    .unwrap_or_default();
                (column.key.to_string(), value)
            })
            .collect();

        let is_placeholder = schema
            .columns
            .iter()
            .zip(&values)
            .all(|(column, (_, value))| value.is_blank() || column.is_example(&value.text()));
        if is_placeholder {
            output.placeholder_count += 1;
            continue;
        }

        let missing: Vec<String> = schema
            .columns
            .iter()
            .zip(&values)
            .filter(|(column, (_, value))| column.required && value.is_blank())
            .map(|(column, _)| column.header.clone())
            .collect();
        if !missing.is_empty() {
            let error = RowError { row_index, missing };
            log::warn!("{}: skipping row - {}", schema.name, error);
            output.skipped_count += 1;
            output.errors.push(error);
            continue;
        }

        output.records.push(TabularRecord { row_index, values });
    }

    log::info!(
        "{}: parsed {} record(s), {} skipped, {} placeholder row(s)",
        schema.name,
        output.records.len(),
        output.skipped_count,
        output.placeholder_count
    );

    Ok(output)
}

/// Scan the header window and map column keys to sheet positions
fn find_header(
    rows: &[Vec<CellValue>],
    schema: &Schema,
    start: usize,
    options: &ParseOptions,
) -> Option<(usize, HashMap<String, usize>)> {
    let end = (start + options.header_scan_window).min(rows.len());

    for row_idx in start..end {
        let headers: Vec<String> = rows[row_idx].iter().map(|c| c.text()).collect();

        let is_header = schema.anchor_keys.iter().any(|key| {
            schema
                .column(key)
                .is_some_and(|column| headers.iter().any(|h| column.matches_header(h)))
        });
        if !is_header {
            continue;
        }

        let mut map = HashMap::new();
        for column in &schema.columns {
            let found = headers.iter().position(|h| column.matches_header(h));
            if let Some(idx) = found.or(column.fallback_index) {
                map.insert(column.key.to_string(), idx);
            }
        }
        return Some((row_idx, map));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::schema::ColumnSpec;

    fn schema() -> Schema {
        Schema::new(
            "Test",
            vec![
                ColumnSpec::new("sr_no", "Sr. No.")
                    .pattern(r"sr\.?\s*no")
                    .unwrap()
                    .required()
                    .example("e.g., 1"),
                ColumnSpec::new("name", "Name")
                    .pattern(r"^name$")
                    .unwrap()
                    .required()
                    .example("Enter name"),
                ColumnSpec::new("note", "Note").example("optional note"),
            ],
        )
        .with_anchors(&["sr_no", "name"])
        .with_hard_required(&["name"])
    }

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    #[test]
    fn test_header_found_after_metadata_rows() {
        let rows = vec![
            row(&["Exported by plant office"]),
            row(&[]),
            row(&["Note", "Sr No", "Name"]),
            row(&["first", "1", "Alpha"]),
        ];
        let output = parse(&rows, &schema()).unwrap();
        assert_eq!(output.header_row, Some(2));
        assert_eq!(output.column_map["sr_no"], 1);
        assert_eq!(output.column_map["name"], 2);
        assert_eq!(output.column_map["note"], 0);
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].text("name"), "Alpha");
        assert_eq!(output.records[0].text("note"), "first");
    }

    #[test]
    fn test_example_and_blank_rows_are_not_errors() {
        let rows = vec![
            row(&["Sr. No.", "Name", "Note"]),
            row(&["e.g., 1", "Enter name", "optional note"]),
            row(&["", "", ""]),
            row(&["e.g., 1", "", ""]),
            row(&["2", "Beta", ""]),
        ];
        let output = parse(&rows, &schema()).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.placeholder_count, 3);
        assert_eq!(output.skipped_count, 0);
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_missing_required_value_is_row_error() {
        let rows = vec![
            row(&["Sr. No.", "Name", "Note"]),
            row(&["1", "", "no name here"]),
            row(&["2", "Gamma", ""]),
        ];
        let output = parse(&rows, &schema()).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.skipped_count, 1);
        assert_eq!(output.errors[0].row_index, 1);
        assert_eq!(output.errors[0].missing, vec!["Name".to_string()]);
    }

    #[test]
    fn test_missing_hard_required_header_fails_whole_import() {
        let rows = vec![row(&["Sr. No.", "Note"]), row(&["1", "x"])];
        let err = parse(&rows, &schema()).unwrap_err();
        assert_eq!(err.missing, vec!["Name".to_string()]);
    }

    #[test]
    fn test_header_outside_window_is_not_found() {
        let rows = vec![
            row(&["a"]),
            row(&["b"]),
            row(&["c"]),
            row(&["Sr. No.", "Name"]),
        ];
        assert!(parse(&rows, &schema()).is_err());

        let options = ParseOptions {
            header_scan_window: 4,
        };
        let output = parse_with(&rows, &schema(), &options).unwrap();
        assert_eq!(output.header_row, Some(3));
    }

    #[test]
    fn test_leading_blank_rows_do_not_count_against_window() {
        let mut rows = vec![row(&[]), row(&["", ""]), vec![CellValue::Empty; 3], row(&[])];
        rows.push(row(&["Sr. No.", "Name"]));
        rows.push(row(&["1", "Delta"]));

        let output = parse(&rows, &schema()).unwrap();
        assert_eq!(output.header_row, Some(4));
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].row_index, 5);
    }

    #[test]
    fn test_positional_fallback_without_header() {
        let schema = Schema::new(
            "Positional",
            vec![
                ColumnSpec::new("a", "A").pattern("^alpha$").unwrap().fallback_index(0),
                ColumnSpec::new("b", "B").required().fallback_index(1),
            ],
        )
        .with_anchors(&["a"]);

        let rows = vec![row(&["x", "y"]), row(&["z", ""])];
        let output = parse(&rows, &schema).unwrap();
        assert_eq!(output.header_row, None);
        assert_eq!(output.data_start_row, 0);
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].text("b"), "y");
        assert_eq!(output.errors.len(), 1);
    }
}
