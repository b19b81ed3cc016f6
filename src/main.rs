use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use quotesync::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Resolve current prices and exchange rates and write them to the sheet
    Run {
        /// Resolve and display everything without writing to the sheet
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => quotesync::cli::setup::setup(),
        Some(Commands::Run { dry_run }) => {
            quotesync::run_command(
                quotesync::AppCommand::Run { dry_run },
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    // A failed run is logged, not turned into a non-zero exit
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "Application failed");
    }
    Ok(())
}
