//! Pipeline orchestration
//!
//! Loader -> excess returns -> benchmark scaling -> strategy -> report.
//! Each stage fully materializes its output before the next one starts, and
//! artifacts are written as soon as they exist. A failure leaves the
//! artifacts of earlier stages in place.

use tracing::info;

use crate::config::{BaseIndex, Config};
use crate::data::{load_artifact, load_series, write_series_csv};
use crate::error::Result;
use crate::report::{build_report, Report, ReportInput};
use crate::returns::excess_returns;
use crate::scaler::{scale_to_target, ScaledReturns};
use crate::stats::{Exposure, StatsSettings};
use crate::strategy::{StrategyRun, VolTargetStrategy};
use crate::TimeSeries;

/// Column name of the persisted strategy returns
pub const STRATEGY_RETURNS_COLUMN: &str = "strategy_returns";
/// Column name of the persisted strategy weights
pub const STRATEGY_WEIGHTS_COLUMN: &str = "strategy_weights";

/// Raw inputs, loaded once and read-only afterwards
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Index level series the excess return is derived from
    pub index: TimeSeries,
    pub rate: TimeSeries,
    pub volatility: TimeSeries,
    /// Selected reference portfolio, replacing the index excess return
    pub portfolio: Option<TimeSeries>,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Benchmark return series before scaling
    pub benchmark_returns: TimeSeries,
    pub benchmark: ScaledReturns,
    pub strategy: StrategyRun,
    pub report: Report,
}

/// Column name of the persisted benchmark returns, e.g. `spx_returns`
pub fn benchmark_column(config: &Config) -> String {
    format!(
        "{}_returns",
        config.benchmark_label().to_lowercase().replace(' ', "_")
    )
}

pub fn stats_settings(config: &Config) -> StatsSettings {
    StatsSettings {
        periods_per_year: config.strategy.periods_per_year,
        rolling_window: config.report.rolling_window,
        shortfall_quantile: config.report.shortfall_quantile,
        exceedance_quantile: config.report.exceedance_quantile,
    }
}

/// Load the inputs the configured run needs
pub fn load_inputs(config: &Config) -> Result<PipelineInputs> {
    let data = &config.data;

    let index = match data.base_index {
        BaseIndex::Price => load_series("price", data.path(&data.price), &data.price)?,
        BaseIndex::TotalReturn => {
            let source = data.total_return.as_ref().ok_or_else(|| {
                crate::PipelineError::Config("no total_return source configured".to_string())
            })?;
            load_series("total_return", data.path(source), source)?
        }
    };
    let rate = load_series("rate", data.path(&data.rate), &data.rate)?;
    let volatility = load_series("volatility", data.path(&data.volatility), &data.volatility)?;

    let portfolio = match &config.benchmark.portfolio {
        Some(name) => {
            let portfolio = data.portfolio(name)?;
            Some(load_series(
                &portfolio.name,
                data.path(&portfolio.source),
                &portfolio.source,
            )?)
        }
        None => None,
    };

    Ok(PipelineInputs {
        index,
        rate,
        volatility,
        portfolio,
    })
}

/// The return series the overlay is applied to
pub fn benchmark_returns(config: &Config, inputs: &PipelineInputs) -> TimeSeries {
    let column = benchmark_column(config);
    match &inputs.portfolio {
        Some(portfolio) => {
            info!("Using reference portfolio {} as benchmark", portfolio.name());
            portfolio.drop_missing().renamed(column)
        }
        None => excess_returns(&column, &inputs.index, &inputs.rate),
    }
}

/// Run every stage on already loaded inputs, writing artifacts as they appear
pub fn run_with_inputs(config: &Config, inputs: &PipelineInputs) -> Result<PipelineOutput> {
    let output = &config.output;
    let params = &config.strategy;

    info!("Stage 2/5: excess returns");
    let benchmark_returns = benchmark_returns(config, inputs);
    write_series_csv(
        output.path(&output.excess_returns_file),
        &benchmark_returns,
        &benchmark_column(config),
    )?;

    info!("Stage 3/5: benchmark volatility scaling");
    let benchmark = scale_to_target(
        "benchmark",
        &benchmark_returns,
        params.target_std,
        params.periods_per_year,
    )?;
    info!(
        "Benchmark k={:.4} ({} observations)",
        benchmark.k,
        benchmark.returns.len()
    );

    info!("Stage 4/5: strategy");
    let strategy = VolTargetStrategy::new(*params).run(&inputs.volatility, &benchmark_returns)?;
    write_series_csv(
        output.path(&output.strategy_returns_file),
        &strategy.returns,
        STRATEGY_RETURNS_COLUMN,
    )?;
    write_series_csv(
        output.path(&output.strategy_weights_file),
        &strategy.weights,
        STRATEGY_WEIGHTS_COLUMN,
    )?;

    info!("Stage 5/5: statistics");
    let report = report_on(config, &benchmark, &strategy.returns, &strategy.weights)?;
    report.write(output)?;

    Ok(PipelineOutput {
        benchmark_returns,
        benchmark,
        strategy,
        report,
    })
}

/// Full run: load inputs from disk, then every downstream stage
pub fn run(config: &Config) -> Result<PipelineOutput> {
    info!("Stage 1/5: loading inputs from {}", config.data.data_dir);
    let inputs = load_inputs(config)?;
    run_with_inputs(config, &inputs)
}

fn report_on(
    config: &Config,
    benchmark: &ScaledReturns,
    strategy_returns: &TimeSeries,
    strategy_weights: &TimeSeries,
) -> Result<Report> {
    let inputs = [
        ReportInput {
            label: config.benchmark_label(),
            returns: &benchmark.returns,
            exposure: Exposure::Static(benchmark.k),
        },
        ReportInput {
            label: config.strategy_label(),
            returns: strategy_returns,
            exposure: Exposure::Dynamic(strategy_weights),
        },
    ];
    build_report(
        &inputs,
        config.report.start,
        config.report.end,
        &stats_settings(config),
    )
}

/// Rebuild the report from persisted return and weight artifacts
///
/// Inputs are not touched. Written series are lossless, so this reproduces
/// the table of the run that wrote them.
pub fn report_from_artifacts(config: &Config) -> Result<Report> {
    let output = &config.output;
    let params = &config.strategy;

    let benchmark_returns = load_artifact(
        output.path(&output.excess_returns_file),
        &benchmark_column(config),
    )?;
    let strategy_returns = load_artifact(
        output.path(&output.strategy_returns_file),
        STRATEGY_RETURNS_COLUMN,
    )?;
    let strategy_weights = load_artifact(
        output.path(&output.strategy_weights_file),
        STRATEGY_WEIGHTS_COLUMN,
    )?;

    let benchmark = scale_to_target(
        "benchmark",
        &benchmark_returns,
        params.target_std,
        params.periods_per_year,
    )?;
    report_on(config, &benchmark, &strategy_returns, &strategy_weights)
}
