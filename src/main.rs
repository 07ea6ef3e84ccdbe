//! Consensus Trader - multi-model trade decision engine
//!
//! # WARNING
//! - Signals come from simple rule-based models, not a trained predictor.
//! - Backtests run on synthetic snapshots and say nothing about live markets.
//! - Proposals are suggestions; nothing here places orders.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

// Use the library crate
use consensus_trader::cli::commands;
use consensus_trader::config::Config;

/// Consensus Trader - weighted multi-model trade analysis
#[derive(Parser)]
#[command(name = "consensus-trader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "ANALYST_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more tickers
    Analyze {
        /// Ticker symbols
        #[arg(required = true)]
        tickers: Vec<String>,

        /// JSON file mapping ticker to snapshot (built-in sample data otherwise)
        #[arg(short, long)]
        snapshots: Option<PathBuf>,

        /// Also generate and queue trade proposals
        #[arg(long)]
        propose: bool,
    },

    /// Run a synthetic market backtest
    Backtest {
        /// Ticker label for the simulation
        #[arg(default_value = "SIM")]
        ticker: String,

        /// Number of iterations (default: backtest.iterations)
        #[arg(short, long)]
        iterations: Option<usize>,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Risk profile override: conservative, moderate or aggressive
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.log_json)?;

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!(config = %cli.config, profile = %config.risk.profile, "Configuration loaded");

    // Execute command
    let result = match cli.command {
        Commands::Analyze {
            tickers,
            snapshots,
            propose,
        } => commands::analyze(&config, &tickers, snapshots.as_deref(), propose).await,
        Commands::Backtest {
            ticker,
            iterations,
            seed,
            profile,
        } => commands::backtest(&config, &ticker, iterations, seed, profile.as_deref()).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("consensus_trader=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
