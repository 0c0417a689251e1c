//! Volatility regime classification
//!
//! Buckets every defined volatility observation into Low, Medium or High using
//! the 33rd and 67th percentiles of the full series. Thresholds are recomputed
//! from scratch on each call; labels depend only on the distribution, never on
//! the order of observations.

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{RegimeError, RegimeResult};
use crate::types::VolatilitySeries;

/// Lower cut: values at or below this quantile are Low
pub const LOW_QUANTILE: f64 = 0.33;
/// Upper cut: values above this quantile are High
pub const HIGH_QUANTILE: f64 = 0.67;

/// Volatility regime label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegimeLabel {
    Low,
    Medium,
    High,
}

impl RegimeLabel {
    pub const ALL: [RegimeLabel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Shading color as RGB
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (0x90, 0xEE, 0x90),
            Self::Medium => (0xFF, 0xD7, 0x00),
            Self::High => (0xFF, 0x6B, 0x6B),
        }
    }

    /// Legend text describing the share of the distribution
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Bottom 33% of volatility",
            Self::Medium => "Middle 33%",
            Self::High => "Top 33%",
        }
    }
}

impl std::fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Percentile value with linear interpolation between closest ranks
///
/// `sorted` must be ascending; `q` is clamped to [0, 1].
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    if idx + 1 >= sorted.len() {
        Some(sorted[idx])
    } else {
        Some(sorted[idx] + (sorted[idx + 1] - sorted[idx]) * frac)
    }
}

/// Percentile cut points over the full volatility distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeThresholds {
    pub p33: f64,
    pub p67: f64,
}

impl RegimeThresholds {
    /// Compute thresholds from every defined volatility value
    pub fn from_volatility(volatility: &VolatilitySeries) -> RegimeResult<Self> {
        let mut values: Vec<f64> = volatility.iter().filter_map(|v| v.annualized_vol).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        match (percentile(&values, LOW_QUANTILE), percentile(&values, HIGH_QUANTILE)) {
            (Some(p33), Some(p67)) => Ok(RegimeThresholds { p33, p67 }),
            _ => Err(RegimeError::InsufficientData(
                "no volatility observations to classify".to_string(),
            )),
        }
    }

    /// Label a value; ties at a boundary go to the lower regime
    pub fn classify(&self, value: f64) -> RegimeLabel {
        if value <= self.p33 {
            RegimeLabel::Low
        } else if value <= self.p67 {
            RegimeLabel::Medium
        } else {
            RegimeLabel::High
        }
    }
}

/// A volatility observation with its regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledVolatility {
    pub date: NaiveDate,
    pub annualized_vol: f64,
    pub regime: RegimeLabel,
}

/// Classify every defined entry of the volatility series
pub fn classify_regimes(
    volatility: &VolatilitySeries,
) -> RegimeResult<(RegimeThresholds, Vec<LabeledVolatility>)> {
    let thresholds = RegimeThresholds::from_volatility(volatility)?;

    let labeled = volatility
        .iter()
        .filter_map(|v| {
            v.annualized_vol.map(|vol| LabeledVolatility {
                date: v.date,
                annualized_vol: vol,
                regime: thresholds.classify(vol),
            })
        })
        .collect();

    Ok((thresholds, labeled))
}

/// Aggregate statistics for one regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats {
    pub regime: RegimeLabel,
    pub count: usize,
    /// Share of labeled observations, in percent
    pub percentage: f64,
    pub mean_volatility: Option<f64>,
}

/// Per-regime statistics in Low, Medium, High order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    pub total: usize,
    pub stats: [RegimeStats; 3],
}

impl RegimeSummary {
    pub fn get(&self, regime: RegimeLabel) -> &RegimeStats {
        &self.stats[regime as usize]
    }
}

/// Count, share and mean volatility per regime
pub fn summarize(labeled: &[LabeledVolatility]) -> RegimeSummary {
    let total = labeled.len();

    let stats = RegimeLabel::ALL.map(|regime| {
        let vols: Vec<f64> = labeled
            .iter()
            .filter(|l| l.regime == regime)
            .map(|l| l.annualized_vol)
            .collect();
        let count = vols.len();

        RegimeStats {
            regime,
            count,
            percentage: if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            mean_volatility: if count > 0 { Some(vols.iter().mean()) } else { None },
        }
    });

    RegimeSummary { total, stats }
}

/// A run of consecutive dates in the same regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeSpan {
    pub regime: RegimeLabel,
    pub start: NaiveDate,
    /// First date of the following span, or the last labeled date
    pub end: NaiveDate,
}

/// Collapse labeled observations into contiguous shading spans
pub fn regime_spans(labeled: &[LabeledVolatility]) -> Vec<RegimeSpan> {
    let Some(last) = labeled.last() else {
        return Vec::new();
    };

    let runs: Vec<(RegimeLabel, NaiveDate)> = labeled
        .iter()
        .chunk_by(|l| l.regime)
        .into_iter()
        .filter_map(|(regime, mut group)| group.next().map(|first| (regime, first.date)))
        .collect();

    runs.iter()
        .enumerate()
        .map(|(i, &(regime, start))| RegimeSpan {
            regime,
            start,
            end: runs.get(i + 1).map(|&(_, next)| next).unwrap_or(last.date),
        })
        .collect()
}
