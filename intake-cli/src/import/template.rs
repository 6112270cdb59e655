//! Equipment bulk-upload template

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

use super::equipment::EQUIPMENT_SCHEMA;

/// Sheet name used by the template
pub const TEMPLATE_SHEET: &str = "Equipment";

const MIN_COLUMN_WIDTH: f64 = 14.0;
const MAX_COLUMN_WIDTH: f64 = 28.0;

/// Write the equipment template to disk
pub fn write_equipment_template(path: &Path) -> Result<()> {
    let mut workbook = build_template()?;
    workbook
        .save(path)
        .with_context(|| format!("Failed to save template: {}", path.display()))?;
    Ok(())
}

/// Equipment template as xlsx bytes
pub fn equipment_template_bytes() -> Result<Vec<u8>> {
    let mut workbook = build_template()?;
    workbook
        .save_to_buffer()
        .context("Failed to render template workbook")
}

fn build_template() -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(TEMPLATE_SHEET)?;

    let header_format = Format::new().set_bold();

    for (col, column) in EQUIPMENT_SCHEMA.columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, &column.header, &header_format)?;
        worksheet.write_string(1, col, &column.example)?;
        worksheet.set_column_width(col, column_width(&column.header))?;
    }

    Ok(workbook)
}

fn column_width(header: &str) -> f64 {
    (header.chars().count() as f64 + 2.0).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::equipment::import_equipment;
    use crate::import::workbook::read_xlsx_bytes;

    #[test]
    fn test_column_width_is_clamped() {
        assert_eq!(column_width("Size"), 14.0);
        assert_eq!(column_width("Design Code (optional)"), 24.0);
        assert_eq!(column_width(&"x".repeat(40)), 28.0);
    }

    #[test]
    fn test_template_round_trip_has_no_records() {
        let bytes = equipment_template_bytes().unwrap();
        let rows = read_xlsx_bytes(&bytes).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].text(), "Sr. No. *");
        assert_eq!(rows[0][7].text(), "Design Code (optional)");

        // The shipped example row is filtered out, so the template alone imports nothing
        let err = import_equipment(&rows).unwrap_err();
        assert!(err.to_string().contains("no rows"));
    }
}
