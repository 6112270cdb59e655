use anyhow::Result;
use colored::*;

use crate::cli::TemplateArgs;
use crate::import::write_equipment_template;

pub fn handle_template_command(args: TemplateArgs) -> Result<()> {
    write_equipment_template(&args.out)?;
    println!(
        "{} Equipment template written to {}",
        "✓".green(),
        args.out.display().to_string().cyan()
    );
    Ok(())
}
