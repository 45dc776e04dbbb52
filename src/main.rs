//! Volatility target overlay - main entry point
//!
//! This binary provides two subcommands:
//! - backtest: Run the full pipeline and write every artifact
//! - report: Recompute the results table from previously written artifacts

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "vol-target")]
#[command(about = "Volatility-targeting overlay backtest with risk/return reporting", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the volatility target backtest
    Backtest {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/spx_vol_target.json")]
        config: String,

        /// Reference portfolio to use instead of the index (overrides config file)
        #[arg(short, long)]
        portfolio: Option<String>,

        /// Report window start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Report window end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Directory for output artifacts (overrides config file)
        #[arg(long)]
        results_dir: Option<String>,
    },

    /// Recompute the results table from written artifacts
    Report {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/spx_vol_target.json")]
        config: String,

        /// Report window start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Report window end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Rewrite the results table and plotting artifacts
        #[arg(long)]
        write: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    // RUST_LOG and friends may come from a .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Backtest { .. } => "backtest",
        Commands::Report { .. } => "report",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Backtest {
            config,
            portfolio,
            start,
            end,
            results_dir,
        } => commands::backtest::run(config, portfolio, start, end, results_dir),

        Commands::Report {
            config,
            start,
            end,
            write,
        } => commands::report::run(config, start, end, write),
    }
}
