//! Read the first sheet of a spreadsheet file into raw rows

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Xlsx, open_workbook_auto};

use crate::cell::{CellValue, RawRow};

/// Read the first sheet of a spreadsheet or CSV file, dispatching on extension
pub fn read_sheet_rows(path: &Path) -> Result<Vec<RawRow>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv_rows(path),
        _ => read_workbook_rows(path),
    }
}

/// Read the first sheet of an xlsx/xls/xlsb/ods workbook
pub fn read_workbook_rows(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .context("Workbook has no sheets")?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

    log::debug!("Reading sheet '{}' from {}", sheet_name, path.display());
    Ok(range_to_rows(&range))
}

/// Read the first sheet of an in-memory xlsx workbook
pub fn read_xlsx_bytes(bytes: &[u8]) -> Result<Vec<RawRow>> {
    read_xlsx(Cursor::new(bytes))
}

fn read_xlsx<RS: Read + Seek>(reader: RS) -> Result<Vec<RawRow>> {
    let mut workbook: Xlsx<_> = Xlsx::new(reader).context("Failed to open xlsx data")?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .context("Workbook has no sheets")?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

    Ok(range_to_rows(&range))
}

/// Convert a calamine range into absolute sheet rows
///
/// calamine trims leading empty rows and columns; they are restored so row and
/// column indices match what a user sees in the sheet.
fn range_to_rows(range: &Range<Data>) -> Vec<RawRow> {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<RawRow> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells: RawRow = vec![CellValue::Empty; col_offset];
        cells.extend(row.iter().map(CellValue::from));
        rows.push(cells);
    }
    rows
}

/// Read a CSV file; every cell stays text
pub fn read_csv_rows(path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    read_csv(file).with_context(|| format!("Failed to read CSV file: {}", path.display()))
}

fn read_csv<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed CSV row")?;
        rows.push(record.iter().map(CellValue::from).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_csv_rows_keep_text_and_ragged_lengths() {
        let data = "Sr. No.,Activity Name\n1,Kick-off,Milestone\n,,\n";
        let rows = read_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[1][0], CellValue::Text("1".into()));
        assert!(rows[2].iter().all(|c| c.is_blank()));
    }

    #[test]
    fn test_xlsx_rows_restore_leading_offsets() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(2, 1, "Tag No.").unwrap();
        worksheet.write_number(3, 1, 42.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = read_xlsx_bytes(&bytes).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_empty());
        assert_eq!(rows[2][0], CellValue::Empty);
        assert_eq!(rows[2][1], CellValue::Text("Tag No.".into()));
        assert_eq!(rows[3][1], CellValue::Number(42.0));
    }
}
