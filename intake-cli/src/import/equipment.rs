//! Equipment bulk upload

use once_cell::sync::Lazy;
use serde::Serialize;

use super::parser::{ParseOptions, RowError, SchemaError, parse_with};
use super::schema::{ColumnSpec, Schema};
use crate::cell::RawRow;
use crate::equipment::{EquipmentDraft, EquipmentFields, Provenance};

pub const SR_NO: &str = "sr_no";
pub const EQUIPMENT_TYPE: &str = "equipment_type";
pub const TAG_NUMBER: &str = "tag_number";
pub const JOB_NUMBER: &str = "job_number";
pub const TITLE: &str = "title";
pub const SIZE: &str = "size";
pub const MATERIAL: &str = "material";
pub const DESIGN_CODE: &str = "design_code";

/// Equipment types offered without registration
pub const STANDARD_EQUIPMENT_TYPES: &[&str] = &[
    "Heat Exchanger",
    "Pressure Vessel",
    "Reactor",
    "Storage Tank",
    "Distillation Column",
];

/// The 8-column equipment schema
pub static EQUIPMENT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let column = |key, header: &str, pattern: &str| {
        ColumnSpec::new(key, header)
            .pattern(pattern)
            .expect("equipment header patterns are valid")
    };

    Schema::new(
        "Equipment",
        vec![
            column(SR_NO, "Sr. No. *", r"sr\.?\s*no\.?")
                .required()
                .example("e.g., 1, 2, 3"),
            column(EQUIPMENT_TYPE, "Equipment Type *", r"equipment\s*type")
                .required()
                .example("e.g., Reactor, Heat Exchanger, Pressure Vessel"),
            column(TAG_NUMBER, "Tag No. *", r"tag\s*no\.?")
                .required()
                .example("e.g., Reactor-Unit-001"),
            column(JOB_NUMBER, "Job No. *", r"job\s*no\.?")
                .required()
                .example("e.g., Job-2024-001"),
            column(TITLE, "Equipment Title *", r"equipment\s*title")
                .required()
                .example("Enter equipment title"),
            column(SIZE, "Size (optional)", r"^size$")
                .example("e.g., 4.2m x 1.6m — Dimensions (length x width x height)"),
            column(MATERIAL, "Material (optional)", r"^material$")
                .example("e.g., SS 304, Carbon Steel — Primary material specification"),
            column(DESIGN_CODE, "Design Code (optional)", r"^design\s*code$")
                .example("e.g., ASME VIII Div 1, TEMA Class R — Applicable design standard"),
        ],
    )
    .with_anchors(&[SR_NO, EQUIPMENT_TYPE, TAG_NUMBER])
    .with_hard_required(&[EQUIPMENT_TYPE, TAG_NUMBER, JOB_NUMBER, TITLE])
});

/// Drafts produced by one bulk upload
#[derive(Debug, Clone, Serialize)]
pub struct EquipmentImport {
    pub drafts: Vec<EquipmentDraft>,
    /// Types in the file that are not standard, in first-seen order
    pub custom_types: Vec<String>,
    pub skipped_count: usize,
    pub errors: Vec<RowError>,
}

/// Bulk upload could not produce any draft
#[derive(Debug, Clone, PartialEq)]
pub enum EquipmentImportError {
    /// Mandatory columns missing from the header
    Schema(SchemaError),
    /// No row carried every mandatory value
    Empty {
        skipped_count: usize,
        errors: Vec<RowError>,
    },
}

impl std::fmt::Display for EquipmentImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquipmentImportError::Schema(err) => write!(f, "{}", err),
            EquipmentImportError::Empty { skipped_count, .. } => write!(
                f,
                "Found no rows with all mandatory fields ({} row(s) skipped)",
                skipped_count
            ),
        }
    }
}

impl std::error::Error for EquipmentImportError {}

impl From<SchemaError> for EquipmentImportError {
    fn from(err: SchemaError) -> Self {
        EquipmentImportError::Schema(err)
    }
}

/// Parse a bulk-upload sheet with default options
pub fn import_equipment(rows: &[RawRow]) -> Result<EquipmentImport, EquipmentImportError> {
    import_equipment_with(rows, &ParseOptions::default())
}

/// Parse a bulk-upload sheet into equipment drafts
pub fn import_equipment_with(
    rows: &[RawRow],
    options: &ParseOptions,
) -> Result<EquipmentImport, EquipmentImportError> {
    let output = parse_with(rows, &EQUIPMENT_SCHEMA, options)?;

    if output.records.is_empty() {
        return Err(EquipmentImportError::Empty {
            skipped_count: output.skipped_count,
            errors: output.errors,
        });
    }

    let mut custom_types: Vec<String> = Vec::new();
    let drafts = output
        .records
        .iter()
        .map(|record| {
            let equipment_type = record.text(EQUIPMENT_TYPE);
            if !is_standard_type(&equipment_type) && !custom_types.contains(&equipment_type) {
                custom_types.push(equipment_type.clone());
            }

            EquipmentDraft {
                id: format!("{}-{}", equipment_type, record.row_index),
                fields: EquipmentFields {
                    equipment_type,
                    tag_number: record.text(TAG_NUMBER),
                    job_number: record.text(JOB_NUMBER),
                    title: record.text(TITLE),
                    size: record.text(SIZE),
                    material: record.text(MATERIAL),
                    design_code: record.text(DESIGN_CODE),
                },
                documents: Vec::new(),
                provenance: Some(Provenance::BulkImported),
            }
        })
        .collect();

    if !custom_types.is_empty() {
        log::info!("Bulk upload introduces equipment type(s): {}", custom_types.join(", "));
    }

    Ok(EquipmentImport {
        drafts,
        custom_types,
        skipped_count: output.skipped_count,
        errors: output.errors,
    })
}

/// Case-insensitive membership in the standard type list
pub fn is_standard_type(equipment_type: &str) -> bool {
    STANDARD_EQUIPMENT_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(equipment_type.trim()))
}
