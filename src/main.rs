//! Signal-to-Trade Core
//!
//! # WARNING
//! - This agent trades with real money. Only use funds you can afford to lose.
//! - Most newly launched tokens go to zero (rug pulls, abandonment).
//! - Testnet success does NOT equal mainnet success.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use stc_core::cli::commands;
use stc_core::config::Config;

#[derive(Parser)]
#[command(name = "stc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestrator against the paper executor until Ctrl+C (no live feed adapter ships in this crate)
    Run {
        /// Evaluate and log decisions but never submit trades
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current risk state, open positions and daily stats
    Status,

    /// Replay a JSONL feed-event fixture through the pipeline, forcing dry-run
    Simulate {
        /// Path to a file of newline-delimited JSON-encoded FeedEvents
        fixture: String,
    },

    /// Show the loaded configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("stc_core=info".parse().unwrap()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run { dry_run } => commands::run(config, dry_run).await,
        Commands::Status => commands::status(&config).await,
        Commands::Simulate { fixture } => commands::simulate(config, &fixture).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
