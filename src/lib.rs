pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use anyhow::Result;
use tracing::{debug, info};

pub use crate::core::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Resolve prices and rates and write them to the sheet.
    Run { dry_run: bool },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("quotesync starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!(
        gateway = %config.gateway.base_url,
        sheet = %config.sheet.base_url,
        "Loaded config"
    );

    match command {
        AppCommand::Run { dry_run } => cli::run::run(&config, dry_run).await,
    }
}
