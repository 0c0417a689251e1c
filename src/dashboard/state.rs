//! Dashboard interaction state, independent of the UI toolkit

use std::sync::Arc;
use tracing::{info, warn};

use crate::data::PriceProvider;
use crate::pipeline::{CachedAnalyzer, RegimeAnalysis};
use crate::types::{RollingWindow, Ticker};

/// Error shown inline above the last good result
#[derive(Debug, Clone, PartialEq)]
pub struct InlineError {
    pub title: String,
    pub message: String,
}

/// Inputs, cached pipeline and the most recent results
pub struct DashboardState<P: PriceProvider> {
    analyzer: CachedAnalyzer<P>,
    pub ticker_input: String,
    pub window: RollingWindow,
    /// Last successful analysis; kept visible when a later request fails
    pub analysis: Option<Arc<RegimeAnalysis>>,
    pub error: Option<InlineError>,
    pub status_message: String,
    /// Set when inputs changed and a recomputation is due
    pub needs_refresh: bool,
    /// Ticker of the last refresh, successful or not
    requested: Option<Ticker>,
}

impl<P: PriceProvider> DashboardState<P> {
    pub fn new(analyzer: CachedAnalyzer<P>, ticker: &Ticker, window: RollingWindow) -> Self {
        Self {
            analyzer,
            ticker_input: ticker.to_string(),
            window,
            analysis: None,
            error: None,
            status_message: String::new(),
            needs_refresh: true,
            requested: None,
        }
    }

    /// Ticker as currently typed, normalized
    pub fn ticker(&self) -> Ticker {
        Ticker::new(&self.ticker_input)
    }

    /// Ticker submitted from the input box
    pub fn submit_ticker(&mut self) {
        self.ticker_input = self.ticker().to_string();
        self.needs_refresh = true;
    }

    /// Input box lost focus; recompute only if the ticker was edited
    pub fn commit_ticker_edit(&mut self) {
        if self.requested.as_ref() != Some(&self.ticker()) {
            self.submit_ticker();
        }
    }

    /// Window picked in the selector
    pub fn select_window(&mut self, window: RollingWindow) {
        if window != self.window {
            self.window = window;
            self.needs_refresh = true;
        }
    }

    /// Run the pipeline for the current inputs (served from cache when possible)
    pub fn refresh(&mut self) {
        self.needs_refresh = false;
        let ticker = self.ticker();
        self.requested = Some(ticker.clone());

        if ticker.is_empty() {
            self.error = Some(InlineError {
                title: "Missing ticker".to_string(),
                message: "Enter a ticker symbol (e.g. SPY, AAPL, MSFT)".to_string(),
            });
            return;
        }

        match self.analyzer.analyze(&ticker, self.window) {
            Ok(analysis) => {
                info!("Showing {} with {} window", ticker, self.window);
                self.status_message = format!(
                    "{} | {} window | {} cached analyses",
                    ticker,
                    self.window,
                    self.analyzer.cached_count()
                );
                self.analysis = Some(analysis);
                self.error = None;
            }
            Err(e) => {
                warn!("Could not analyze {}: {}", ticker, e);
                self.status_message = format!("Could not load data for {}", ticker);
                self.error = Some(InlineError {
                    title: e.title().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    pub fn cached_count(&self) -> usize {
        self.analyzer.cached_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RegimeError, RegimeResult};
    use crate::types::{DateRange, PricePoint, PriceSeries};
    use chrono::{Duration, NaiveDate};
    use std::cell::Cell;

    /// Knows only SPY; counts calls
    struct SpyOnly {
        calls: Cell<usize>,
    }

    impl PriceProvider for SpyOnly {
        fn fetch_prices(&self, ticker: &Ticker, range: &DateRange) -> RegimeResult<PriceSeries> {
            self.calls.set(self.calls.get() + 1);
            if ticker.as_str() != "SPY" {
                return Err(RegimeError::DataUnavailable {
                    ticker: ticker.to_string(),
                    start: range.start,
                    end: range.end,
                });
            }
            PriceSeries::new(
                (0..90)
                    .map(|i| PricePoint {
                        date: range.start + Duration::days(i),
                        close: 300.0 + ((i * 13) % 17) as f64,
                    })
                    .collect(),
            )
        }
    }

    fn state() -> DashboardState<SpyOnly> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let range = DateRange::new(start, start + Duration::days(200));
        let analyzer = CachedAnalyzer::new(SpyOnly { calls: Cell::new(0) }, range, None);
        DashboardState::new(analyzer, &Ticker::default(), RollingWindow::Days30)
    }

    #[test]
    fn test_initial_refresh() {
        let mut state = state();
        assert!(state.needs_refresh);

        state.refresh();
        assert!(!state.needs_refresh);
        assert!(state.error.is_none());
        assert_eq!(state.analysis.as_ref().unwrap().ticker.as_str(), "SPY");
    }

    #[test]
    fn test_error_keeps_previous_result() {
        let mut state = state();
        state.refresh();

        state.ticker_input = "zzzz".to_string();
        state.submit_ticker();
        assert_eq!(state.ticker_input, "ZZZZ");
        state.refresh();

        let error = state.error.as_ref().unwrap();
        assert_eq!(error.title, "Data unavailable");
        assert_eq!(state.analysis.as_ref().unwrap().ticker.as_str(), "SPY");
    }

    #[test]
    fn test_window_change_triggers_refresh() {
        let mut state = state();
        state.refresh();

        state.select_window(RollingWindow::Days30);
        assert!(!state.needs_refresh);

        state.select_window(RollingWindow::Days60);
        assert!(state.needs_refresh);
        state.refresh();
        assert_eq!(state.analysis.as_ref().unwrap().window, RollingWindow::Days60);
        assert_eq!(state.cached_count(), 2);

        // Back to a cached pair: no provider call
        state.select_window(RollingWindow::Days30);
        state.refresh();
        assert_eq!(state.analyzer.provider().calls.get(), 2);
    }

    #[test]
    fn test_blur_commits_only_edits() {
        let mut state = state();
        state.refresh();

        // Focus lost without an edit
        state.commit_ticker_edit();
        assert!(!state.needs_refresh);

        // Same ticker typed differently
        state.ticker_input = " spy".to_string();
        state.commit_ticker_edit();
        assert!(!state.needs_refresh);

        state.ticker_input = "qqq".to_string();
        state.commit_ticker_edit();
        assert!(state.needs_refresh);
        assert_eq!(state.ticker_input, "QQQ");
        state.refresh();
        assert!(state.error.is_some());

        // A failed ticker is not refetched on every blur
        state.commit_ticker_edit();
        assert!(!state.needs_refresh);
        assert_eq!(state.analyzer.provider().calls.get(), 2);
    }

    #[test]
    fn test_empty_ticker() {
        let mut state = state();
        state.ticker_input = "   ".to_string();
        state.submit_ticker();
        state.refresh();

        assert_eq!(state.error.as_ref().unwrap().title, "Missing ticker");
        assert!(state.analysis.is_none());
    }
}
