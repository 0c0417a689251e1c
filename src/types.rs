//! Core data types used across the regime pipeline

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{RegimeError, RegimeResult};

/// Ticker symbol using Arc<str> for cheap cloning
///
/// Tickers are cloned into cache keys and analyses on every dashboard
/// interaction, so the string is shared rather than reallocated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(Arc<str>);

impl Ticker {
    /// Create a ticker, trimming whitespace and upper-casing the symbol
    pub fn new(s: impl AsRef<str>) -> Self {
        Ticker(Arc::from(s.as_ref().trim().to_uppercase().as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Ticker::new("SPY")
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rolling volatility window in trading days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum RollingWindow {
    Days20,
    #[default]
    Days30,
    Days60,
}

impl RollingWindow {
    pub const ALL: [RollingWindow; 3] = [Self::Days20, Self::Days30, Self::Days60];

    pub fn days(self) -> usize {
        match self {
            Self::Days20 => 20,
            Self::Days30 => 30,
            Self::Days60 => 60,
        }
    }
}

impl TryFrom<usize> for RollingWindow {
    type Error = RegimeError;

    fn try_from(days: usize) -> Result<Self, Self::Error> {
        match days {
            20 => Ok(Self::Days20),
            30 => Ok(Self::Days30),
            60 => Ok(Self::Days60),
            other => Err(RegimeError::UnsupportedWindow(other)),
        }
    }
}

impl From<RollingWindow> for usize {
    fn from(window: RollingWindow) -> Self {
        window.days()
    }
}

impl std::fmt::Display for RollingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} days", self.days())
    }
}

/// Inclusive calendar date range for price requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Range from `start` through today (local time)
    pub fn until_today(start: NaiveDate) -> Self {
        DateRange {
            start,
            end: Local::now().date_naive(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Daily adjusted close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily adjusted closes, strictly increasing by date
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting duplicate or out-of-order dates
    pub fn new(points: Vec<PricePoint>) -> RegimeResult<Self> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(RegimeError::UnorderedDates(pair[1].date));
            }
        }
        Ok(PriceSeries { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Price on a given date (binary search over the sorted dates)
    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].close)
    }
}

/// Daily log return
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub log_return: f64,
}

/// Log returns, one entry shorter than the price series they came from
pub type ReturnSeries = Vec<ReturnPoint>;

/// Annualized volatility at a date; `None` until the window is filled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityPoint {
    pub date: NaiveDate,
    pub annualized_vol: Option<f64>,
}

/// Rolling volatility aligned one-to-one with the return dates
pub type VolatilitySeries = Vec<VolatilityPoint>;
