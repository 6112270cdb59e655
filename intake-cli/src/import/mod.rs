//! Spreadsheet imports: schemas, the tabular parser, and the two upload flows

pub mod activities;
pub mod equipment;
pub mod parser;
pub mod schema;
pub mod template;
pub mod workbook;

pub use activities::{
    ActivitySchedule, ActivitySpec, ActivityType, parse_activity_schedule,
    parse_activity_schedule_with,
};
pub use equipment::{
    EQUIPMENT_SCHEMA, EquipmentImport, EquipmentImportError, STANDARD_EQUIPMENT_TYPES,
    import_equipment, import_equipment_with,
};
pub use parser::{ParseOptions, ParseOutput, RowError, SchemaError, TabularRecord, parse, parse_with};
pub use schema::{ColumnSpec, PreambleRule, Schema};
pub use template::{equipment_template_bytes, write_equipment_template};
pub use workbook::{read_csv_rows, read_sheet_rows, read_workbook_rows, read_xlsx_bytes};
