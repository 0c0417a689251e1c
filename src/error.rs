//! Error types for the regime pipeline

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while fetching prices or computing regimes
#[derive(Debug, Error)]
pub enum RegimeError {
    #[error("no price data available for {ticker} between {start} and {end}")]
    DataUnavailable {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid price {price} on {date}: log returns need strictly positive prices")]
    InvalidPrice { date: NaiveDate, price: f64 },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("unsupported rolling window {0} (expected 20, 30 or 60)")]
    UnsupportedWindow(usize),

    #[error("price dates must be strictly increasing (offending date {0})")]
    UnorderedDates(NaiveDate),

    #[error("malformed provider response: {0}")]
    Parse(String),

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RegimeError {
    /// Short, user-facing title for the error kind
    pub fn title(&self) -> &'static str {
        match self {
            Self::DataUnavailable { .. } => "Data unavailable",
            Self::Network(_) => "Network error",
            Self::InvalidPrice { .. } => "Invalid price",
            Self::InsufficientData(_) => "Insufficient data",
            Self::UnsupportedWindow(_) => "Unsupported window",
            Self::UnorderedDates(_) => "Unordered price history",
            Self::Parse(_) => "Malformed response",
            Self::Render(_) => "Rendering failed",
            Self::Io(_) => "I/O error",
        }
    }
}

impl From<reqwest::Error> for RegimeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

pub type RegimeResult<T> = Result<T, RegimeError>;
