//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable overrides. Every section has defaults, so a missing file yields a
//! working SPY / 30-day / 2010-present setup.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{DateRange, RollingWindow, Ticker};

/// Default configuration file, used when present
pub const DEFAULT_CONFIG_PATH: &str = "configs/default.json";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env()?;
        Ok(config)
    }

    /// Load an explicit file, else the default file if it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                let mut config = Config::default();
                config.apply_env()?;
                Ok(config)
            }
        }
    }

    /// Override values from `VOLREGIME_*` environment variables
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(ticker) = std::env::var("VOLREGIME_TICKER") {
            self.analysis.ticker = ticker;
        }
        if let Ok(window) = std::env::var("VOLREGIME_WINDOW") {
            let days: usize = window
                .parse()
                .context("VOLREGIME_WINDOW must be a number of days")?;
            self.analysis.window = RollingWindow::try_from(days)?;
        }
        if let Ok(output) = std::env::var("VOLREGIME_OUTPUT") {
            self.output.path = PathBuf::from(output);
        }
        Ok(())
    }

    /// Check the loaded values are usable
    pub fn validate(&self) -> Result<()> {
        if self.analysis.ticker().is_empty() {
            anyhow::bail!("Ticker must not be empty");
        }
        let range = self.analysis.date_range();
        if range.start > range.end {
            anyhow::bail!(
                "Start date {} is after end date {}",
                range.start,
                range.end
            );
        }
        if self.output.width == 0 || self.output.height == 0 {
            anyhow::bail!("Chart dimensions must be non-zero");
        }
        Ok(())
    }
}

/// What to analyze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub ticker: String,
    pub start_date: NaiveDate,
    /// Inclusive end date; today when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub window: RollingWindow,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            ticker: "SPY".to_string(),
            start_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
            end_date: None,
            window: RollingWindow::Days30,
        }
    }
}

impl AnalysisConfig {
    pub fn ticker(&self) -> Ticker {
        Ticker::new(&self.ticker)
    }

    pub fn date_range(&self) -> DateRange {
        match self.end_date {
            Some(end) => DateRange::new(self.start_date, end),
            None => DateRange::until_today(self.start_date),
        }
    }
}

/// Static chart output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: PathBuf::from("outputs/spy_volatility_regimes.svg"),
            width: 1400,
            height: 800,
        }
    }
}

/// Market data provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 30,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Interactive dashboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Expire cached analyses after this many seconds; never when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,
    pub width: f32,
    pub height: f32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            cache_ttl_secs: None,
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analysis.ticker().as_str(), "SPY");
        assert_eq!(config.analysis.window, RollingWindow::Days30);
        assert_eq!(
            config.analysis.start_date,
            NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()
        );
        assert!(config.dashboard.cache_ttl_secs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "analysis": { "ticker": "qqq", "start_date": "2015-06-01", "window": 60 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.analysis.ticker().as_str(), "QQQ");
        assert_eq!(config.analysis.window, RollingWindow::Days60);
        assert_eq!(config.output.width, 1400);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn test_shipped_default_config() {
        let config: Config = serde_json::from_str(include_str!("../configs/default.json")).unwrap();
        assert_eq!(config.analysis.ticker().as_str(), "SPY");
        assert_eq!(config.analysis.window, RollingWindow::Days30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unsupported_window() {
        let json = r#"{ "analysis": { "ticker": "SPY", "start_date": "2015-06-01", "window": 45 } }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_validate_inverted_range() {
        let mut config = Config::default();
        config.analysis.end_date = NaiveDate::from_ymd_opt(2005, 1, 1);
        assert!(config.validate().is_err());
    }
}
