//! Volatility Target Overlay
//!
//! Backtests a volatility-targeting overlay on an equity index against a
//! buy-and-hold benchmark. Exposure is scaled inversely to lagged implied
//! volatility, both legs are rescaled ex-post to the same annualized
//! volatility, and the result is summarized in a risk/return report.
//!
//! The pipeline is a chain of pure stages:
//!
//! 1. [`data`]: CSV loading into [`TimeSeries`]
//! 2. [`returns`]: excess-of-risk-free returns
//! 3. [`scaler`]: ex-post volatility targeting
//! 4. [`strategy`]: inverse-volatility weights
//! 5. [`stats`], [`monthly`], [`report`]: statistics and artifacts
//!
//! [`pipeline::run`] wires them together.
//!
//! ```no_run
//! use vol_target::{pipeline, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("configs/spx_vol_target.json")?;
//!     let output = pipeline::run(&config)?;
//!     println!("{}", output.report.table.render());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod monthly;
pub mod pipeline;
pub mod report;
pub mod returns;
pub mod scaler;
pub mod stats;
pub mod strategy;
pub mod types;

pub use config::{Config, StrategyParameters};
pub use error::{PipelineError, Result};
pub use monthly::MonthlyReturns;
pub use report::{Report, ReportTable};
pub use strategy::{StrategyRun, VolTargetStrategy};
pub use types::*;
