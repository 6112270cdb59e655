//! Equipment intake: spreadsheet imports and project equipment reconciliation

pub mod cell;
pub mod cli;
pub mod config;
pub mod dates;
pub mod equipment;
pub mod form;
pub mod import;
pub mod store;

pub use cell::{CellValue, RawRow};
pub use config::IntakeConfig;
