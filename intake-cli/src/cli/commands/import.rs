//! `import equipment` / `import activities`

use anyhow::{Context, Result};
use colored::*;

use crate::cli::{ImportArgs, ImportCommands};
use crate::config::IntakeConfig;
use crate::dates::format_date;
use crate::form::FormState;
use crate::import::{
    EquipmentImportError, RowError, import_equipment_with, parse_activity_schedule_with,
    read_sheet_rows,
};

pub fn handle_import_command(command: ImportCommands, config: &IntakeConfig) -> Result<()> {
    match command {
        ImportCommands::Equipment(args) => import_equipment_file(args, config),
        ImportCommands::Activities(args) => import_activities_file(args, config),
    }
}

fn import_equipment_file(args: ImportArgs, config: &IntakeConfig) -> Result<()> {
    let rows = read_sheet_rows(&args.file)?;
    let options = config.import.parse_options();

    let import = match import_equipment_with(&rows, &options) {
        Ok(import) => import,
        Err(EquipmentImportError::Empty {
            skipped_count,
            errors,
        }) => {
            print_row_errors(&errors);
            anyhow::bail!(
                "No rows with all mandatory fields in {} ({} skipped)",
                args.file.display(),
                skipped_count
            );
        }
        Err(err) => return Err(err.into()),
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&import).context("Failed to serialize import")?
        );
        return Ok(());
    }

    let form = FormState::new_project().merge_imported(import.drafts.clone());
    println!(
        "{} {} equipment row(s) imported from {}",
        "✓".green(),
        import.drafts.len().to_string().bold(),
        args.file.display().to_string().cyan()
    );
    for (equipment_type, count) in form.quantities() {
        println!("  {:<24} {}", equipment_type, count);
    }
    if !import.custom_types.is_empty() {
        println!(
            "{} New equipment type(s): {}",
            "+".blue(),
            import.custom_types.join(", ")
        );
    }
    if import.skipped_count > 0 {
        println!(
            "{} {} row(s) skipped for missing mandatory fields",
            "⚠".yellow(),
            import.skipped_count
        );
        print_row_errors(&import.errors);
    }

    Ok(())
}

fn import_activities_file(args: ImportArgs, config: &IntakeConfig) -> Result<()> {
    let rows = read_sheet_rows(&args.file)?;
    let schedule = parse_activity_schedule_with(&rows, &config.import.parse_options())?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&schedule).context("Failed to serialize schedule")?
        );
        return Ok(());
    }

    match schedule.commencement_date {
        Some(date) => println!("Commencement: {}", format_date(date).cyan()),
        None => println!("Commencement: {}", "not set".dimmed()),
    }

    for activity in &schedule.activities {
        let target = activity
            .target_date
            .map(format_date)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>3}. {:<40} {:<15} {:<12} {}",
            activity.sr_no,
            activity.activity_name,
            activity.activity_type.to_string(),
            target,
            activity.target_relative.dimmed()
        );
    }

    println!(
        "{} {} activit(ies) parsed",
        "✓".green(),
        schedule.activities.len()
    );
    if schedule.skipped_count > 0 {
        println!(
            "{} {} row(s) skipped for a missing activity name",
            "⚠".yellow(),
            schedule.skipped_count
        );
        print_row_errors(&schedule.errors);
    }

    Ok(())
}

fn print_row_errors(errors: &[RowError]) {
    for error in errors {
        println!("    {}", error.to_string().yellow());
    }
}
