//! Viewsync inspection CLI.
//!
//! Loads a JSON array of records and prints the synchronized table or page
//! tree the library keeps over them.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod output;
mod records;

use cli::{Cli, Commands};
use config::ViewConfig;
use output::OutputFormat;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("viewsync=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);
    let config = ViewConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Table(args) => commands::table::run(args, config, format),
        Commands::Tree(args) => commands::tree::run(args, config, format),
    }
}
