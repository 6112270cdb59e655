//! `project create` / `project export`

use anyhow::{Context, Result};
use colored::*;

use super::open_store;
use crate::cli::ProjectCommands;
use crate::config::IntakeConfig;
use crate::form::FormState;
use crate::store::EquipmentStore;

pub async fn handle_project_command(command: ProjectCommands, config: &IntakeConfig) -> Result<()> {
    let store = open_store(config).await?;

    match command {
        ProjectCommands::Create { name } => {
            let id = store.create_project(&name).await?;
            println!("{} Created project {}", "✓".green(), name.bold());
            println!("{}", id);
        }
        ProjectCommands::Export { project } => {
            let records = store
                .query_by_project(&project)
                .await
                .with_context(|| format!("Failed to load equipment for project {}", project))?;
            let form = FormState::loaded_from_store(&records);
            println!(
                "{}",
                serde_json::to_string_pretty(form.drafts()).context("Failed to serialize drafts")?
            );
        }
    }

    Ok(())
}
