//! Backtest command implementation

use anyhow::{Context, Result};
use tracing::{debug, info};
use vol_target::{pipeline, Config};

pub fn run(
    config_path: String,
    portfolio_override: Option<String>,
    start_override: Option<String>,
    end_override: Option<String>,
    results_dir_override: Option<String>,
) -> Result<()> {
    info!("Starting backtest");

    // Load configuration
    let mut config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path))?;
    info!("Loaded configuration from: {}", config_path);

    // Apply overrides
    if let Some(portfolio) = portfolio_override {
        info!("Overriding benchmark portfolio to: {}", portfolio);
        config.benchmark.portfolio = Some(portfolio);
    }

    if let Some(results_dir) = results_dir_override {
        info!("Overriding results directory to: {}", results_dir);
        config.output.results_dir = results_dir;
    }

    super::apply_window(&mut config, start_override, end_override)?;
    debug!("Strategy parameters: {:?}", config.strategy);

    info!("Running backtest...");
    let output = pipeline::run(&config).context("Backtest failed")?;

    // Print results
    println!("\n{}", output.report.table.render());
    println!("Benchmark scale k:  {:.4}", output.benchmark.k);
    println!("Strategy scale k:   {:.4}", output.strategy.k);
    println!("Observations:       {}", output.strategy.returns.len());
    for monthly in &output.report.monthly {
        println!("\n{}", monthly.render());
    }
    println!("{}", "=".repeat(60));
    println!("Artifacts written to: {}", config.output.results_dir);

    info!("Backtest completed successfully");

    Ok(())
}
