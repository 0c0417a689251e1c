//! Volatility Regimes
//!
//! Rolling volatility regime analysis for equity tickers: fetch daily adjusted
//! closes, compute log returns and annualized rolling volatility, bucket the
//! volatility into Low/Medium/High percentile regimes, and present the result
//! as a static chart or an interactive dashboard.

pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod pipeline;
pub mod regime;
pub mod types;

#[cfg(feature = "dashboard")]
pub mod dashboard;

pub use config::Config;
pub use error::{RegimeError, RegimeResult};
pub use pipeline::{analyze, compute, CachedAnalyzer, RegimeAnalysis};
pub use regime::{RegimeLabel, RegimeSummary, RegimeThresholds};
pub use types::*;
