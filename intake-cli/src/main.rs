use anyhow::Result;
use clap::Parser;
use colored::*;

use intake_cli::cli::commands::{import, project, reconcile, template};
use intake_cli::cli::{Cli, Commands};
use intake_cli::config::IntakeConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = IntakeConfig::load(cli.config.as_deref())?;
    log::debug!("Using database {}", config.database_url);

    match cli.command {
        Commands::Template(args) => template::handle_template_command(args),
        Commands::Import(command) => import::handle_import_command(command, &config),
        Commands::Reconcile(args) => reconcile::handle_reconcile_command(args, &config).await,
        Commands::Project(command) => project::handle_project_command(command, &config).await,
    }
}
