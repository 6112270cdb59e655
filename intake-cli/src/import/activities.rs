//! Activity schedule upload
//!
//! A schedule sheet may open with a commencement row (`Commencement Date | 01-04-2024`
//! or just a date in the first cell). Targets are either absolute dates or
//! expressions such as `2nd week` resolved against the commencement date.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::parser::{ParseOptions, RowError, SchemaError, TabularRecord, parse_with};
use super::schema::{ColumnSpec, PreambleRule, Schema};
use crate::cell::{CellValue, RawRow};
use crate::dates::{format_date, parse_date, resolve_relative};

pub const SR_NO: &str = "sr_no";
pub const ACTIVITY_NAME: &str = "activity_name";
pub const ACTIVITY_TYPE: &str = "activity_type";
pub const TARGET: &str = "target";

/// The 4-column activity schema with its commencement preamble
pub static ACTIVITY_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let column = |key, header: &str, pattern: &str, index: usize| {
        ColumnSpec::new(key, header)
            .pattern(pattern)
            .expect("activity header patterns are valid")
            .fallback_index(index)
    };

    Schema::new(
        "Activity schedule",
        vec![
            column(SR_NO, "Sr. No.", "sr", 0),
            column(
                ACTIVITY_NAME,
                "Activity Name",
                r"activity.*name|name.*activity|^\s*activity\s*$",
                1,
            )
            .required(),
            column(ACTIVITY_TYPE, "Activity Type", "type", 2),
            column(TARGET, "Target", "target", 3),
        ],
    )
    .with_anchors(&[SR_NO, ACTIVITY_NAME])
    .with_preamble(PreambleRule::new("commencement"))
});

/// Kind of schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    RegularUpdate,
    Milestone,
}

impl ActivityType {
    /// `milestone` when the text mentions it, otherwise a regular update
    pub fn from_text(text: &str) -> Self {
        if text.to_lowercase().contains("milestone") {
            ActivityType::Milestone
        } else {
            ActivityType::RegularUpdate
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::RegularUpdate => write!(f, "regular_update"),
            ActivityType::Milestone => write!(f, "milestone"),
        }
    }
}

/// One parsed schedule row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySpec {
    pub sr_no: u32,
    pub activity_name: String,
    pub activity_type: ActivityType,
    /// Target as written, or the resolved date when the cell held a date
    pub target_relative: String,
    pub target_date: Option<NaiveDate>,
    pub sort_order: usize,
}

/// A parsed schedule
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySchedule {
    pub commencement_date: Option<NaiveDate>,
    pub activities: Vec<ActivitySpec>,
    pub skipped_count: usize,
    pub errors: Vec<RowError>,
}

/// Parse a schedule sheet with default options
pub fn parse_activity_schedule(rows: &[RawRow]) -> Result<ActivitySchedule, SchemaError> {
    parse_activity_schedule_with(rows, &ParseOptions::default())
}

/// Parse a schedule sheet
pub fn parse_activity_schedule_with(
    rows: &[RawRow],
    options: &ParseOptions,
) -> Result<ActivitySchedule, SchemaError> {
    let output = parse_with(rows, &ACTIVITY_SCHEMA, options)?;

    let commencement_date = output.preamble.as_ref().and_then(|p| parse_date(&p.value));
    if let Some(preamble) = &output.preamble {
        if commencement_date.is_none() {
            log::warn!(
                "Commencement value '{}' is not a date; relative targets stay unresolved",
                preamble.value
            );
        }
    }

    let activities = output
        .records
        .iter()
        .map(|record| activity_from(record, output.data_start_row, commencement_date))
        .collect();

    Ok(ActivitySchedule {
        commencement_date,
        activities,
        skipped_count: output.skipped_count,
        errors: output.errors,
    })
}

fn activity_from(
    record: &TabularRecord,
    data_start_row: usize,
    commencement: Option<NaiveDate>,
) -> ActivitySpec {
    let sort_order = record.row_index - data_start_row;
    let target = record.get(TARGET).cloned().unwrap_or_default();
    let target_text = target.text();

    let target_date = parse_date(&target).or_else(|| {
        let anchor = commencement?;
        let resolved = resolve_relative(&target_text, anchor);
        if resolved.is_none() && !target_text.is_empty() {
            log::debug!("Target '{}' could not be resolved", target_text);
        }
        resolved
    });

    let target_relative = if target_text.is_empty() {
        target_date.map(format_date).unwrap_or_default()
    } else {
        target_text
    };

    ActivitySpec {
        sr_no: sequence_number(record.get(SR_NO), sort_order + 1),
        activity_name: record.text(ACTIVITY_NAME),
        activity_type: ActivityType::from_text(&record.text(ACTIVITY_TYPE)),
        target_relative,
        target_date,
        sort_order,
    }
}

/// Floored sequence value, at least 1, else the row's position
fn sequence_number(cell: Option<&CellValue>, position: usize) -> u32 {
    let value = cell.and_then(|c| match c {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    });

    match value {
        Some(n) if n.is_finite() => n.floor().max(1.0).min(u32::MAX as f64) as u32,
        _ => position as u32,
    }
}
