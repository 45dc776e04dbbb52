//! Command implementations

pub mod backtest;
pub mod report;

use anyhow::{Context, Result};
use tracing::info;
use vol_target::{data, Config};

/// Parse a `--start`/`--end` argument
fn parse_date_arg(flag: &str, value: &str) -> Result<chrono::NaiveDate> {
    data::parse_date(value).with_context(|| format!("Invalid {} date: {}", flag, value))
}

/// Apply report window overrides and re-check the result
pub(crate) fn apply_window(
    config: &mut Config,
    start_override: Option<String>,
    end_override: Option<String>,
) -> Result<()> {
    if let Some(start) = start_override {
        info!("Overriding report start date to: {}", start);
        config.report.start = Some(parse_date_arg("start", &start)?);
    }

    if let Some(end) = end_override {
        info!("Overriding report end date to: {}", end);
        config.report.end = Some(parse_date_arg("end", &end)?);
    }

    config.validate()?;
    Ok(())
}
