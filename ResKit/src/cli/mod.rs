//! ResKit CLI - Command-line interface for resource index tools

pub mod commands;

use clap::Parser;
use commands::Commands;

use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "reskit")]
#[command(about = "ResKit: resource index and resource selection tools", long_about = None)]
#[command(version = crate::VERSION)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); defaults to the settings file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Run the ResKit CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_or_default();

    // Setup logging
    crate::logging::init(cli.log_level.as_deref().unwrap_or(&settings.log_level))?;

    cli.command.execute(&settings)?;

    Ok(())
}
