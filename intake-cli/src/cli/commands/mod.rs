//! Subcommand handlers

pub mod import;
pub mod project;
pub mod reconcile;
pub mod template;

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::IntakeConfig;
use crate::store::SqliteStore;

/// Open the configured SQLite store, creating its directory when needed
pub async fn open_store(config: &IntakeConfig) -> Result<SqliteStore> {
    let url = &config.database_url;
    if let Some(path) = url.strip_prefix("sqlite://") {
        if !url.contains(":memory:") {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }
    }
    SqliteStore::connect(url).await
}
