//! Application configuration
//!
//! Loaded from `<config dir>/equipment-intake/config.toml`; a missing file
//! means defaults. `INTAKE_DATABASE_URL` (also read from `.env`) overrides the
//! database URL.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::equipment::reconcile::DEFAULT_FAILURE_PREVIEW;
use crate::import::parser::{DEFAULT_HEADER_SCAN_WINDOW, ParseOptions};

/// Directory name under the platform config/data dirs
pub const APP_DIR: &str = "equipment-intake";

/// Environment variable overriding the database URL
pub const DATABASE_URL_ENV: &str = "INTAKE_DATABASE_URL";

/// Import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Rows searched for a header after any preamble
    pub header_scan_window: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            header_scan_window: DEFAULT_HEADER_SCAN_WINDOW,
        }
    }
}

impl ImportConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            header_scan_window: self.header_scan_window.max(1),
        }
    }
}

/// Reconciliation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Failures named in the summary line
    pub failure_preview: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            failure_preview: DEFAULT_FAILURE_PREVIEW,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub database_url: String,
    pub import: ImportConfig,
    pub reconcile: ReconcileConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            import: ImportConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl IntakeConfig {
    /// Load from `path` (or the default location), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load from a TOML file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database_url = url;
            }
        }
    }
}

/// `<config dir>/equipment-intake/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn default_database_url() -> String {
    let path = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("intake.db");
    format!("sqlite://{}", path.display())
}
