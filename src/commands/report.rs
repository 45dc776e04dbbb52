//! Report command implementation
//!
//! Rebuilds the results table from the return and weight files a previous
//! backtest wrote, without touching the raw inputs.

use anyhow::{Context, Result};
use tracing::info;
use vol_target::{pipeline, Config};

pub fn run(
    config_path: String,
    start_override: Option<String>,
    end_override: Option<String>,
    write: bool,
) -> Result<()> {
    info!("Starting report");

    let mut config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path))?;
    info!("Loaded configuration from: {}", config_path);

    super::apply_window(&mut config, start_override, end_override)?;

    info!("Reading artifacts from: {}", config.output.results_dir);
    let report = pipeline::report_from_artifacts(&config)
        .context("Failed to rebuild report from artifacts")?;

    println!("\n{}", report.table.render());

    if write {
        report.write(&config.output)?;
        info!("Report artifacts rewritten in {}", config.output.results_dir);
    }

    info!("Report completed successfully");

    Ok(())
}
