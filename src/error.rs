//! Error types for the volatility-targeting pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline failures
///
/// Alignment gaps are deliberately absent: dates present in one series but
/// not another are dropped, never reported.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed input in '{series}': {reason}")]
    MalformedInput { series: String, reason: String },

    #[error("degenerate input in {stage} for '{series}': standard deviation {std_dev} is zero or near zero")]
    DegenerateInput {
        stage: &'static str,
        series: String,
        std_dev: f64,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl PipelineError {
    pub fn malformed(series: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::MalformedInput {
            series: series.into(),
            reason: reason.into(),
        }
    }

    /// Too few observations for a statistic
    pub fn insufficient(series: impl Into<String>, what: &str, required: usize, actual: usize) -> Self {
        PipelineError::MalformedInput {
            series: series.into(),
            reason: format!(
                "{} needs at least {} observations, got {}",
                what, required, actual
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
