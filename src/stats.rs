//! Risk/return statistics
//!
//! Everything here returns raw `f64` values; presentation formatting lives in
//! [`crate::report`]. Statistics that cannot be computed from the available
//! observations return `MalformedInput` instead of a NaN.

use statrs::statistics::Statistics;

use crate::error::{PipelineError, Result};
use crate::monthly::MonthlyReturns;
use crate::scaler::MIN_STD_DEV;
use crate::TimeSeries;

/// Parameters shared by every statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSettings {
    pub periods_per_year: u32,
    pub rolling_window: usize,
    pub shortfall_quantile: f64,
    pub exceedance_quantile: f64,
}

impl StatsSettings {
    fn annualization(&self) -> f64 {
        (self.periods_per_year as f64).sqrt()
    }
}

impl Default for StatsSettings {
    fn default() -> Self {
        StatsSettings {
            periods_per_year: 252,
            rolling_window: 30,
            shortfall_quantile: 0.01,
            exceedance_quantile: 0.99,
        }
    }
}

/// How a series was held over the window
#[derive(Debug, Clone, Copy)]
pub enum Exposure<'a> {
    /// Fixed notional, e.g. the benchmark's ex-post scaling factor
    Static(f64),
    /// Time-varying position weights
    Dynamic(&'a TimeSeries),
}

/// One row of the report, unformatted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStatistics {
    pub mean: f64,
    pub std: f64,
    pub sharpe_ratio: f64,
    pub total_return: f64,
    pub turnover: f64,
    pub mean_notional: f64,
    pub vol_of_vol: f64,
    pub mean_shortfall: f64,
    pub mean_exceedance: f64,
}

/// Which side of the distribution a tail statistic looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// Strictly below the quantile
    Lower,
    /// Strictly above the quantile
    Upper,
}

/// Compute the full statistics row for one return series
pub fn compute_statistics(
    returns: &TimeSeries,
    exposure: Exposure<'_>,
    settings: &StatsSettings,
) -> Result<SeriesStatistics> {
    let mean = annualized_monthly_mean(returns)?;
    let std = annualized_log_std(returns, settings.periods_per_year)?;
    let sharpe_ratio = mean / std;
    let total_return = total_return(returns)?;

    let (turnover, mean_notional) = match exposure {
        Exposure::Static(notional) => (0.0, notional),
        Exposure::Dynamic(weights) => (
            turnover(weights, settings.periods_per_year)?,
            mean_notional(weights)?,
        ),
    };

    let vol_of_vol = vol_of_vol(returns, settings)?;
    let mean_shortfall = tail_mean(returns, settings.shortfall_quantile, Tail::Lower)?;
    let mean_exceedance = tail_mean(returns, settings.exceedance_quantile, Tail::Upper)?;

    Ok(SeriesStatistics {
        mean,
        std,
        sharpe_ratio,
        total_return,
        turnover,
        mean_notional,
        vol_of_vol,
        mean_shortfall,
        mean_exceedance,
    })
}

/// Mean of monthly log-return sums, times 12
pub fn annualized_monthly_mean(returns: &TimeSeries) -> Result<f64> {
    MonthlyReturns::from_returns(returns)
        .annualized_mean()
        .ok_or_else(|| PipelineError::insufficient(returns.name(), "mean", 1, 0))
}

/// Sample standard deviation of daily log returns, annualized
pub fn annualized_log_std(returns: &TimeSeries, periods_per_year: u32) -> Result<f64> {
    if returns.len() < 2 {
        return Err(PipelineError::insufficient(
            returns.name(),
            "standard deviation",
            2,
            returns.len(),
        ));
    }
    let log_returns = returns.log1p();
    if let Some((date, r)) = returns
        .iter()
        .zip(log_returns.values())
        .find_map(|((date, r), log_r)| (!log_r.is_finite()).then_some((date, r)))
    {
        return Err(PipelineError::malformed(
            returns.name(),
            format!("return {} on {} has no finite log return", r, date),
        ));
    }
    let std = log_returns.std_dev();
    if std.is_nan() || std <= MIN_STD_DEV {
        return Err(PipelineError::DegenerateInput {
            stage: "statistics",
            series: returns.name().to_string(),
            std_dev: std,
        });
    }
    Ok(std * (periods_per_year as f64).sqrt())
}

/// Compounded return over the whole series: `prod(1 + r) - 1`
pub fn total_return(returns: &TimeSeries) -> Result<f64> {
    if returns.is_empty() {
        return Err(PipelineError::insufficient(returns.name(), "total return", 1, 0));
    }
    Ok(returns.values().iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0)
}

/// `mean(|Δw|) * periods_per_year / (2 * mean(w))`
///
/// A constant weight series has exactly zero turnover.
pub fn turnover(weights: &TimeSeries, periods_per_year: u32) -> Result<f64> {
    if weights.len() < 2 {
        return Err(PipelineError::insufficient(
            weights.name(),
            "turnover",
            2,
            weights.len(),
        ));
    }
    let mean_change = weights
        .values()
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .mean();
    Ok(mean_change * periods_per_year as f64 / (2.0 * weights.mean()))
}

/// Average weight over the window
pub fn mean_notional(weights: &TimeSeries) -> Result<f64> {
    if weights.is_empty() {
        return Err(PipelineError::insufficient(weights.name(), "mean notional", 1, 0));
    }
    Ok(weights.mean())
}

/// Sample standard deviation over a trailing window, dated at the window's end
///
/// The first value appears once `window` observations are available.
pub fn rolling_std(returns: &TimeSeries, window: usize) -> TimeSeries {
    if window < 2 || returns.len() < window {
        return TimeSeries::empty(returns.name());
    }
    let dates = returns.dates()[window - 1..].to_vec();
    let values = returns
        .values()
        .windows(window)
        .map(|w| w.iter().std_dev())
        .collect();
    TimeSeries::new(returns.name(), dates, values)
        .unwrap_or_else(|_| TimeSeries::empty(returns.name()))
}

/// Standard deviation of the annualized rolling volatility
pub fn vol_of_vol(returns: &TimeSeries, settings: &StatsSettings) -> Result<f64> {
    let required = settings.rolling_window + 1;
    if returns.len() < required {
        return Err(PipelineError::insufficient(
            returns.name(),
            "vol of vol",
            required,
            returns.len(),
        ));
    }
    let rolling = rolling_std(returns, settings.rolling_window);
    Ok(rolling.std_dev() * settings.annualization())
}

/// Quantile with linear interpolation between order statistics
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    if idx + 1 >= sorted.len() {
        Some(sorted[idx])
    } else {
        Some(sorted[idx] + (sorted[idx + 1] - sorted[idx]) * frac)
    }
}

/// Observations strictly beyond the series' own `q` quantile
pub fn tail_observations(returns: &TimeSeries, q: f64, tail: Tail) -> TimeSeries {
    let Some(threshold) = quantile(returns.values(), q) else {
        return TimeSeries::empty(returns.name());
    };
    let kept: Vec<_> = returns
        .iter()
        .filter(|(_, r)| match tail {
            Tail::Lower => *r < threshold,
            Tail::Upper => *r > threshold,
        })
        .collect();
    let (dates, values): (Vec<_>, Vec<_>) = kept.into_iter().unzip();
    TimeSeries::new(returns.name(), dates, values)
        .unwrap_or_else(|_| TimeSeries::empty(returns.name()))
}

/// Mean of the tail observations beyond the `q` quantile
pub fn tail_mean(returns: &TimeSeries, q: f64, tail: Tail) -> Result<f64> {
    let observations = tail_observations(returns, q, tail);
    if observations.is_empty() {
        let what = match tail {
            Tail::Lower => "mean shortfall",
            Tail::Upper => "mean exceedance",
        };
        return Err(PipelineError::malformed(
            returns.name(),
            format!("{}: no observations beyond the {} quantile", what, q),
        ));
    }
    Ok(observations.mean())
}
