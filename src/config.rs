//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. Every field has a
//! default matching the reference run, so a config file only needs to name
//! what differs.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub strategy: StrategyParameters,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges and cross references
    pub fn validate(&self) -> crate::Result<()> {
        let s = &self.strategy;
        if s.target_std.is_nan() || s.target_std <= 0.0 {
            return Err(PipelineError::Config(format!(
                "target_std must be positive, got {}",
                s.target_std
            )));
        }
        let bounds_ok = s.floor > 0.0 && s.floor <= s.cap;
        if !bounds_ok {
            return Err(PipelineError::Config(format!(
                "weight bounds must satisfy 0 < floor <= cap, got floor={} cap={}",
                s.floor, s.cap
            )));
        }
        if s.periods_per_year == 0 {
            return Err(PipelineError::Config(
                "periods_per_year must be positive".to_string(),
            ));
        }
        if self.report.rolling_window < 2 {
            return Err(PipelineError::Config(format!(
                "rolling_window must be at least 2, got {}",
                self.report.rolling_window
            )));
        }
        for (name, q) in [
            ("shortfall_quantile", self.report.shortfall_quantile),
            ("exceedance_quantile", self.report.exceedance_quantile),
        ] {
            if q.is_nan() || q <= 0.0 || q >= 1.0 {
                return Err(PipelineError::Config(format!(
                    "{} must lie strictly between 0 and 1, got {}",
                    name, q
                )));
            }
        }
        for (name, source) in self.data.sources() {
            if !source.divisor.is_finite() || source.divisor <= 0.0 {
                return Err(PipelineError::Config(format!(
                    "divisor of source '{}' ({}) must be finite and positive, got {}",
                    name, source.file, source.divisor
                )));
            }
        }
        if let (Some(start), Some(end)) = (self.report.start, self.report.end) {
            if start > end {
                return Err(PipelineError::Config(format!(
                    "report start {} is after end {}",
                    start, end
                )));
            }
        }
        if let Some(name) = &self.benchmark.portfolio {
            self.data.portfolio(name)?;
        }
        if self.data.base_index == BaseIndex::TotalReturn && self.data.total_return.is_none() {
            return Err(PipelineError::Config(
                "base_index is total_return but no total_return source is configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Row label of the benchmark series in every report artifact
    pub fn benchmark_label(&self) -> String {
        if let Some(label) = &self.benchmark.label {
            return label.clone();
        }
        match &self.benchmark.portfolio {
            Some(name) => name.clone(),
            None => "SPX".to_string(),
        }
    }

    /// Row label of the strategy series, e.g. "SPX 20% Target"
    pub fn strategy_label(&self) -> String {
        match &self.benchmark.strategy_label {
            Some(label) => label.clone(),
            None => format!(
                "{} {:.0}% Target",
                self.benchmark_label(),
                self.strategy.target_std * 100.0
            ),
        }
    }
}

/// Volatility-targeting parameters, fixed for a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParameters {
    /// Annualized target volatility
    pub target_std: f64,
    /// Maximum weight
    pub cap: f64,
    /// Minimum weight
    pub floor: f64,
    /// Observations between a volatility print and the weight it sets
    pub vol_lag: usize,
    pub periods_per_year: u32,
}

impl StrategyParameters {
    pub fn annualization(&self) -> f64 {
        (self.periods_per_year as f64).sqrt()
    }
}

impl Default for StrategyParameters {
    fn default() -> Self {
        StrategyParameters {
            target_std: 0.20,
            cap: 2.0,
            floor: 0.5,
            vol_lag: 2,
            periods_per_year: 252,
        }
    }
}

/// Which index level series the excess return is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseIndex {
    #[default]
    Price,
    TotalReturn,
}

/// One CSV input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// File name, relative to `data_dir`
    pub file: String,
    /// First row names the columns
    #[serde(default)]
    pub header: bool,
    /// Column name when `header` is set, otherwise a zero-based index
    #[serde(default = "default_date_column")]
    pub date_column: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
    /// Values are divided by this (100 for series quoted in percent)
    #[serde(default = "default_divisor")]
    pub divisor: f64,
    /// Drop rows with a missing value instead of keeping them as NaN
    #[serde(default)]
    pub drop_missing: bool,
}

fn default_date_column() -> String {
    "0".to_string()
}

fn default_value_column() -> String {
    "1".to_string()
}

fn default_divisor() -> f64 {
    1.0
}

impl SourceConfig {
    /// Headerless two-column file: date, value
    pub fn two_column(file: impl Into<String>) -> Self {
        SourceConfig {
            file: file.into(),
            header: false,
            date_column: default_date_column(),
            value_column: default_value_column(),
            divisor: default_divisor(),
            drop_missing: false,
        }
    }

    /// File with a header row, columns selected by name
    pub fn named(
        file: impl Into<String>,
        date_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        SourceConfig {
            file: file.into(),
            header: true,
            date_column: date_column.into(),
            value_column: value_column.into(),
            divisor: default_divisor(),
            drop_missing: false,
        }
    }
}

/// Reference portfolio return series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub name: String,
    #[serde(flatten)]
    pub source: SourceConfig,
}

/// Input data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: String,
    pub base_index: BaseIndex,
    pub price: SourceConfig,
    pub total_return: Option<SourceConfig>,
    pub rate: SourceConfig,
    pub volatility: SourceConfig,
    pub portfolios: Vec<PortfolioConfig>,
}

impl DataConfig {
    pub fn path(&self, source: &SourceConfig) -> PathBuf {
        Path::new(&self.data_dir).join(&source.file)
    }

    /// Every configured input, labelled for error messages
    pub fn sources(&self) -> Vec<(&str, &SourceConfig)> {
        let mut sources = vec![
            ("price", &self.price),
            ("rate", &self.rate),
            ("volatility", &self.volatility),
        ];
        if let Some(total_return) = &self.total_return {
            sources.push(("total_return", total_return));
        }
        sources.extend(self.portfolios.iter().map(|p| (p.name.as_str(), &p.source)));
        sources
    }

    /// Look up a reference portfolio by name
    pub fn portfolio(&self, name: &str) -> crate::Result<&PortfolioConfig> {
        self.portfolios
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| {
                let known: Vec<&str> = self.portfolios.iter().map(|p| p.name.as_str()).collect();
                PipelineError::Config(format!(
                    "unknown portfolio '{}'. Available portfolios: {}",
                    name,
                    known.join(", ")
                ))
            })
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        let mut hi_bm = SourceConfig::named("Portfolios_Formed_on_BE-ME_Daily.csv", "Date", "Hi 10");
        hi_bm.divisor = 100.0;
        hi_bm.drop_missing = true;

        let mut hi_momentum =
            SourceConfig::named("10_Portfolios_Prior_12_2_Daily.csv", "date", "Hi PRIOR");
        hi_momentum.divisor = 100.0;

        DataConfig {
            data_dir: "data".to_string(),
            base_index: BaseIndex::Price,
            price: SourceConfig::two_column("spx.csv"),
            total_return: Some(SourceConfig::two_column("sptr.csv")),
            rate: SourceConfig::two_column("tbill.csv"),
            volatility: SourceConfig::named("^VIX.csv", "Date", "Adj Close"),
            portfolios: vec![
                PortfolioConfig {
                    name: "hi_momentum".to_string(),
                    source: hi_momentum,
                },
                PortfolioConfig {
                    name: "hi_bm".to_string(),
                    source: hi_bm,
                },
            ],
        }
    }
}

/// Benchmark selection and labels
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Use this reference portfolio instead of the index excess return
    pub portfolio: Option<String>,
    pub label: Option<String>,
    pub strategy_label: Option<String>,
}

/// Statistics window and parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub rolling_window: usize,
    pub shortfall_quantile: f64,
    pub exceedance_quantile: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            start: NaiveDate::from_ymd_opt(2000, 1, 1),
            end: None,
            rolling_window: 30,
            shortfall_quantile: 0.01,
            exceedance_quantile: 0.99,
        }
    }
}

/// Output artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: String,
    pub excess_returns_file: String,
    pub strategy_returns_file: String,
    pub strategy_weights_file: String,
    pub results_table_file: String,
    pub pnl_file: String,
    pub rolling_vol_file: String,
    pub shortfall_file: String,
}

impl OutputConfig {
    pub fn path(&self, file: &str) -> PathBuf {
        Path::new(&self.results_dir).join(file)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            results_dir: "results".to_string(),
            excess_returns_file: "spx_return_excess.csv".to_string(),
            strategy_returns_file: "strategy_return_excess.csv".to_string(),
            strategy_weights_file: "strategy_weights.csv".to_string(),
            results_table_file: "SPX_results_table.csv".to_string(),
            pnl_file: "pnl.csv".to_string(),
            rolling_vol_file: "30dayvol.csv".to_string(),
            shortfall_file: "shortfall_returns.csv".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = Config::default();
        assert_eq!(config.strategy.target_std, 0.20);
        assert_eq!(config.strategy.cap, 2.0);
        assert_eq!(config.strategy.floor, 0.5);
        assert_eq!(config.strategy.vol_lag, 2);
        assert_eq!(config.strategy.periods_per_year, 252);
        assert_eq!(config.report.rolling_window, 30);
        assert_eq!(config.report.start, NaiveDate::from_ymd_opt(2000, 1, 1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_labels() {
        let config = Config::default();
        assert_eq!(config.benchmark_label(), "SPX");
        assert_eq!(config.strategy_label(), "SPX 20% Target");
    }

    #[test]
    fn test_portfolio_labels() {
        let mut config = Config::default();
        config.benchmark.portfolio = Some("hi_momentum".to_string());
        assert_eq!(config.benchmark_label(), "hi_momentum");
        assert_eq!(config.strategy_label(), "hi_momentum 20% Target");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "strategy": { "target_std": 0.1 }, "report": { "start": "2010-01-01" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.strategy.target_std, 0.1);
        assert_eq!(config.strategy.cap, 2.0);
        assert_eq!(config.report.start, NaiveDate::from_ymd_opt(2010, 1, 1));
        assert_eq!(config.data.price.file, "spx.csv");
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut config = Config::default();
        config.strategy.floor = 3.0;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_divisor() {
        for divisor in [0.0, -100.0, f64::NAN, f64::INFINITY] {
            let mut config = Config::default();
            config.data.rate.divisor = divisor;
            let err = config.validate().unwrap_err();
            assert!(matches!(err, PipelineError::Config(_)), "divisor {divisor}");
            assert!(err.to_string().contains("'rate'"));
        }

        let mut config = Config::default();
        config.data.portfolios[1].source.divisor = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'hi_bm'"));
    }

    #[test]
    fn test_validate_rejects_quantiles_outside_unit_interval() {
        for q in [0.0, 1.0, 1.5, -0.01, f64::NAN] {
            let mut config = Config::default();
            config.report.shortfall_quantile = q;
            assert!(matches!(config.validate(), Err(PipelineError::Config(_))), "q {q}");

            let mut config = Config::default();
            config.report.exceedance_quantile = q;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("exceedance_quantile"));
        }
    }

    #[test]
    fn test_validate_rejects_nan_target() {
        let mut config = Config::default();
        config.strategy.target_std = f64::NAN;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_portfolio() {
        let mut config = Config::default();
        config.benchmark.portfolio = Some("lo_momentum".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hi_momentum"));
    }
}
