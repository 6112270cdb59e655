//! `reconcile`: save submitted drafts to a project

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use colored::*;

use super::open_store;
use crate::cli::ReconcileArgs;
use crate::config::IntakeConfig;
use crate::equipment::{EquipmentDraft, ReconcileOptions, ReconciliationDecision, reconcile};

pub async fn handle_reconcile_command(args: ReconcileArgs, config: &IntakeConfig) -> Result<()> {
    let content = std::fs::read_to_string(&args.drafts)
        .with_context(|| format!("Failed to read drafts file: {}", args.drafts.display()))?;
    let drafts: Vec<EquipmentDraft> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid drafts JSON: {}", args.drafts.display()))?;

    let store = open_store(config).await?;

    // Ctrl-C stops the run between store calls
    let abort = Arc::new(AtomicBool::new(false));
    let signal_flag = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current item");
            signal_flag.store(true, Ordering::SeqCst);
        }
    });

    let options = ReconcileOptions { abort: Some(abort) };
    let outcome = reconcile(&store, &args.project, &drafts, args.edit, &options).await?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
        );
        return Ok(());
    }

    for entry in &outcome.decisions {
        let marker = match &entry.decision {
            ReconciliationDecision::Create => "+".green(),
            ReconciliationDecision::Update(_) => "~".blue(),
            ReconciliationDecision::Skip(_) => "-".yellow(),
        };
        println!("  {} {:<24} {}", marker, entry.label, entry.decision);
    }

    println!(
        "{} {} saved, {} skipped",
        "✓".green(),
        outcome.applied_count.to_string().bold(),
        outcome.skipped_count
    );
    match outcome.equipment_count {
        Some(count) => println!("Project equipment count: {}", count.to_string().cyan()),
        None => println!("Project equipment count: {}", "unknown".yellow()),
    }
    if outcome.aborted {
        println!("{} Run interrupted before all items were saved", "⚠".yellow());
    }
    if let Some(summary) = outcome.failure_summary(config.reconcile.failure_preview) {
        println!(
            "{} {} item(s) failed: {}",
            "✗".red(),
            outcome.failures.len(),
            summary
        );
    }

    Ok(())
}
