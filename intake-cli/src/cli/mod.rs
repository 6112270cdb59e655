//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "intake-cli",
    version,
    about = "Equipment bulk upload, activity schedules and project equipment reconciliation"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: <config dir>/equipment-intake/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the equipment bulk-upload template
    Template(TemplateArgs),
    /// Parse an equipment or activity spreadsheet
    #[command(subcommand)]
    Import(ImportCommands),
    /// Save submitted equipment drafts to a project
    Reconcile(ReconcileArgs),
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Output path for the .xlsx template
    #[arg(long, short, default_value = "equipment-template.xlsx")]
    pub out: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Equipment bulk upload (8-column template)
    Equipment(ImportArgs),
    /// Activity schedule with optional commencement date
    Activities(ImportArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// .xlsx, .xls, .ods or .csv file
    pub file: PathBuf,

    /// Print the parsed result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Project id
    #[arg(long)]
    pub project: String,

    /// JSON file holding the submitted equipment drafts
    #[arg(long, value_name = "PATH")]
    pub drafts: PathBuf,

    /// Drafts come from editing an existing project
    #[arg(long)]
    pub edit: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project and print its id
    Create {
        #[arg(long)]
        name: String,
    },
    /// Print a project's equipment drafts as JSON (input for `reconcile --edit`)
    Export {
        #[arg(long)]
        project: String,
    },
}
