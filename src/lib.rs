pub mod cli;
pub mod core;
pub mod io;

use crate::cli::process::ProcessArgs;
use crate::core::config::AppConfig;
use crate::io::CsvLoader;
use anyhow::Result;
use tracing::debug;

/// Commands that run against a loaded configuration.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Process(ProcessArgs),
}

pub fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Process(args) => cli::process::run(&args, &config, &CsvLoader).map(|_| ()),
    }
}
