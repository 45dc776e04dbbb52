//! Inverse implied-volatility overlay
//!
//! Position size on date `t` is `target_std / (vol[t - lag] / 100)`, clipped
//! into `[floor, cap]`. The lag is counted in observations of the volatility
//! series and models the delay between observing a volatility print and
//! trading on it. The weighted returns are then rescaled ex-post to the target
//! volatility so the strategy and the benchmark are compared at equal risk.

use tracing::{debug, info};

use crate::config::StrategyParameters;
use crate::error::Result;
use crate::scaler::scale_to_target;
use crate::TimeSeries;

/// Output of one strategy run
#[derive(Debug, Clone)]
pub struct StrategyRun {
    /// Weights on the dates of the final return series
    pub weights: TimeSeries,
    /// Weighted excess returns before the ex-post rescale
    pub raw_returns: TimeSeries,
    /// Final returns at the target volatility
    pub returns: TimeSeries,
    /// Ex-post scaling factor applied to `raw_returns`
    pub k: f64,
}

/// Volatility-targeting strategy
#[derive(Debug, Clone)]
pub struct VolTargetStrategy {
    params: StrategyParameters,
}

impl VolTargetStrategy {
    pub fn new(params: StrategyParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrategyParameters {
        &self.params
    }

    /// Clip a raw weight into `[floor, cap]`; an undefined weight stays undefined
    pub fn clip_weight(&self, raw: f64) -> f64 {
        if raw.is_nan() {
            return raw;
        }
        raw.max(self.params.floor).min(self.params.cap)
    }

    /// Weight series from an implied volatility series quoted in percent
    ///
    /// The first `vol_lag` volatility dates have no weight, nor does any date
    /// whose lagged volatility is missing. Zero volatility maps to `cap`.
    pub fn weights(&self, volatility: &TimeSeries) -> TimeSeries {
        let target_std = self.params.target_std;
        volatility
            .shift(self.params.vol_lag)
            .map(|vol| self.clip_weight(target_std / (vol / 100.0)))
            .drop_missing()
            .renamed("strategy_weights")
    }

    /// Apply the overlay to `returns` and rescale to the target volatility
    pub fn run(&self, volatility: &TimeSeries, returns: &TimeSeries) -> Result<StrategyRun> {
        let weights = self.weights(volatility);
        debug!(
            "Computed {} weights from {} volatility observations (lag {})",
            weights.len(),
            volatility.len(),
            self.params.vol_lag
        );

        let raw_returns = weights
            .mul(returns)
            .drop_missing()
            .renamed("strategy_returns");
        debug!(
            "{} weighted returns ({} weights and {} returns before alignment)",
            raw_returns.len(),
            weights.len(),
            returns.len()
        );

        let scaled = scale_to_target(
            "strategy",
            &raw_returns,
            self.params.target_std,
            self.params.periods_per_year,
        )?;
        let weights = weights.restrict_to(&scaled.returns);

        info!(
            "Strategy: {} returns, mean weight {:.4}, ex-post k={:.4}",
            scaled.returns.len(),
            weights.mean(),
            scaled.k
        );

        Ok(StrategyRun {
            weights,
            raw_returns,
            returns: scaled.returns,
            k: scaled.k,
        })
    }
}
