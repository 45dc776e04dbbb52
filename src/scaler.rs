//! Ex-post volatility targeting
//!
//! A single factor `k = target_std / (stdev * sqrt(periods_per_year))` is
//! computed from the full sample and applied to every observation. The
//! normalization uses information from the whole window and is therefore
//! look-ahead biased; it exists for comparative reporting only.

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::TimeSeries;

/// Standard deviations at or below this are treated as zero
pub const MIN_STD_DEV: f64 = 1e-12;

/// A return series rescaled to the target volatility
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledReturns {
    pub returns: TimeSeries,
    /// Multiplier applied to every observation
    pub k: f64,
}

/// Factor that brings `returns` to `target_std` annualized volatility
pub fn scaling_factor(
    stage: &'static str,
    returns: &TimeSeries,
    target_std: f64,
    periods_per_year: u32,
) -> Result<f64> {
    if returns.len() < 2 {
        return Err(PipelineError::insufficient(
            returns.name(),
            "volatility scaling",
            2,
            returns.len(),
        ));
    }
    let std_dev = returns.std_dev();
    if !std_dev.is_finite() || std_dev <= MIN_STD_DEV {
        return Err(PipelineError::DegenerateInput {
            stage,
            series: returns.name().to_string(),
            std_dev,
        });
    }
    let annual_std = std_dev * (periods_per_year as f64).sqrt();
    Ok(target_std / annual_std)
}

/// Rescale `returns` so its full-sample annualized volatility is `target_std`
pub fn scale_to_target(
    stage: &'static str,
    returns: &TimeSeries,
    target_std: f64,
    periods_per_year: u32,
) -> Result<ScaledReturns> {
    let k = scaling_factor(stage, returns, target_std, periods_per_year)?;
    debug!("{}: scaling {} by k={:.6}", stage, returns.name(), k);
    Ok(ScaledReturns {
        returns: returns.scale(k),
        k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn returns(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let dates = (0..values.len()).map(|i| start + Duration::days(i as i64)).collect();
        TimeSeries::new("r", dates, values.to_vec()).unwrap()
    }

    #[test]
    fn test_scaled_series_hits_target() {
        let r = returns(&[0.01, -0.02, 0.015, 0.003, -0.007, 0.021, -0.011]);
        let scaled = scale_to_target("test", &r, 0.2, 252).unwrap();
        let realized = scaled.returns.std_dev() * 252f64.sqrt();
        assert_relative_eq!(realized, 0.2, max_relative = 1e-9);
    }

    #[test]
    fn test_k_is_single_factor() {
        let r = returns(&[0.01, -0.02, 0.015, 0.003]);
        let scaled = scale_to_target("test", &r, 0.2, 252).unwrap();
        for (orig, new) in r.values().iter().zip(scaled.returns.values()) {
            assert_relative_eq!(*new, orig * scaled.k, max_relative = 1e-15);
        }
    }

    #[test]
    fn test_zero_std_is_degenerate() {
        let r = returns(&[0.01, 0.01, 0.01]);
        let err = scale_to_target("benchmark", &r, 0.2, 252).unwrap_err();
        match err {
            PipelineError::DegenerateInput { stage, series, .. } => {
                assert_eq!(stage, "benchmark");
                assert_eq!(series, "r");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_single_observation_is_malformed() {
        let r = returns(&[0.01]);
        let err = scale_to_target("benchmark", &r, 0.2, 252).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }
}
