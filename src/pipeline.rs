//! Regime analysis pipeline
//!
//! Fetch → returns → volatility → classification → summary, plus the
//! memoizing wrapper the dashboard uses so repeated `(ticker, window)` requests
//! never go back to the provider.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::data::{validate_prices, PriceProvider};
use crate::error::{RegimeError, RegimeResult};
use crate::indicators::{log_returns, rolling_volatility};
use crate::regime::{
    classify_regimes, regime_spans, summarize, LabeledVolatility, RegimeLabel, RegimeSpan,
    RegimeSummary, RegimeThresholds,
};
use crate::types::{DateRange, PriceSeries, ReturnSeries, RollingWindow, Ticker, VolatilitySeries};

/// Everything computed for one `(ticker, window)` pair
#[derive(Debug, Clone)]
pub struct RegimeAnalysis {
    pub ticker: Ticker,
    pub window: RollingWindow,
    pub prices: PriceSeries,
    pub returns: ReturnSeries,
    pub volatility: VolatilitySeries,
    pub thresholds: RegimeThresholds,
    pub labeled: Vec<LabeledVolatility>,
    pub summary: RegimeSummary,
    pub spans: Vec<RegimeSpan>,
}

impl RegimeAnalysis {
    /// First and last price dates
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.prices.first()?.date, self.prices.last()?.date))
    }

    /// Regime of the most recent labeled observation
    pub fn current_regime(&self) -> Option<RegimeLabel> {
        self.labeled.last().map(|l| l.regime)
    }

    /// `(date, price, regime)` for every labeled date
    pub fn labeled_prices(&self) -> Vec<(NaiveDate, f64, RegimeLabel)> {
        self.labeled
            .iter()
            .filter_map(|l| self.prices.price_on(l.date).map(|p| (l.date, p, l.regime)))
            .collect()
    }
}

/// Run the calculation and classification stages over fetched prices
pub fn compute(
    ticker: Ticker,
    window: RollingWindow,
    prices: PriceSeries,
) -> RegimeResult<RegimeAnalysis> {
    if prices.len() < 2 {
        return Err(RegimeError::InsufficientData(format!(
            "{} price observations for {}; at least 2 are needed for returns",
            prices.len(),
            ticker
        )));
    }

    let report = validate_prices(&prices);
    for warning in &report.warnings {
        debug!("{}: {}", ticker, warning);
    }
    for error in &report.errors {
        warn!("{}: {}", ticker, error);
    }

    let returns = log_returns(&prices)?;
    if returns.len() < window.days() {
        return Err(RegimeError::InsufficientData(format!(
            "{} returns for {}; a {} window needs at least {}",
            returns.len(),
            ticker,
            window,
            window.days()
        )));
    }

    let volatility = rolling_volatility(&returns, window);
    let (thresholds, labeled) = classify_regimes(&volatility)?;
    let summary = summarize(&labeled);
    let spans = regime_spans(&labeled);

    info!(
        "{} ({}): {} labeled days, p33={:.4}, p67={:.4}, {} regime spans",
        ticker,
        window,
        labeled.len(),
        thresholds.p33,
        thresholds.p67,
        spans.len()
    );

    Ok(RegimeAnalysis {
        ticker,
        window,
        prices,
        returns,
        volatility,
        thresholds,
        labeled,
        summary,
        spans,
    })
}

/// Fetch prices and run the full pipeline once
pub fn analyze<P: PriceProvider + ?Sized>(
    provider: &P,
    ticker: &Ticker,
    range: &DateRange,
    window: RollingWindow,
) -> RegimeResult<RegimeAnalysis> {
    let prices = provider.fetch_prices(ticker, range)?;
    compute(ticker.clone(), window, prices)
}

// =============================================================================
// Analysis Cache
// =============================================================================

/// In-memory cache of analyses keyed by `(ticker, window)`
///
/// Entries live for the process unless a TTL is set; expired entries are
/// evicted on the next insert. There is no explicit invalidation.
pub struct AnalysisCache {
    data: HashMap<(Ticker, RollingWindow), CachedAnalysis>,
    ttl: Option<Duration>,
}

struct CachedAnalysis {
    analysis: Arc<RegimeAnalysis>,
    stored_at: Instant,
}

impl AnalysisCache {
    /// Create a new cache; `ttl` of `None` keeps entries forever
    pub fn new(ttl: Option<Duration>) -> Self {
        AnalysisCache {
            data: HashMap::new(),
            ttl,
        }
    }

    /// Get a fresh analysis (returns None if stale or missing)
    pub fn get(&self, ticker: &Ticker, window: RollingWindow) -> Option<Arc<RegimeAnalysis>> {
        self.data
            .get(&(ticker.clone(), window))
            .filter(|cached| match self.ttl {
                Some(ttl) => cached.stored_at.elapsed() < ttl,
                None => true,
            })
            .map(|cached| Arc::clone(&cached.analysis))
    }

    /// Store an analysis under its own ticker and window, dropping expired entries
    pub fn insert(&mut self, analysis: Arc<RegimeAnalysis>) {
        if let Some(ttl) = self.ttl {
            self.data.retain(|_, cached| cached.stored_at.elapsed() < ttl);
        }
        self.data.insert(
            (analysis.ticker.clone(), analysis.window),
            CachedAnalysis {
                analysis,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Pipeline runner memoized on `(ticker, window)` over a fixed date range
pub struct CachedAnalyzer<P: PriceProvider> {
    provider: P,
    range: DateRange,
    cache: AnalysisCache,
}

impl<P: PriceProvider> CachedAnalyzer<P> {
    pub fn new(provider: P, range: DateRange, ttl: Option<Duration>) -> Self {
        Self {
            provider,
            range,
            cache: AnalysisCache::new(ttl),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Return the cached analysis, or fetch and compute it
    ///
    /// Failures are not cached, so a later request retries the provider.
    pub fn analyze(
        &mut self,
        ticker: &Ticker,
        window: RollingWindow,
    ) -> RegimeResult<Arc<RegimeAnalysis>> {
        if let Some(hit) = self.cache.get(ticker, window) {
            debug!("Cache hit for {} ({})", ticker, window);
            return Ok(hit);
        }

        let analysis = Arc::new(analyze(&self.provider, ticker, &self.range, window)?);
        self.cache.insert(Arc::clone(&analysis));
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;
    use chrono::Duration as ChronoDuration;
    use std::cell::Cell;

    fn prices(n: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        PriceSeries::new(
            (0..n)
                .map(|i| PricePoint {
                    date: start + ChronoDuration::days(i as i64),
                    close: 100.0 * (1.0 + 0.01 * ((i * 7 % 11) as f64 - 5.0) / 5.0),
                })
                .collect(),
        )
        .unwrap()
    }

    struct CountingProvider {
        calls: Cell<usize>,
        len: usize,
    }

    impl PriceProvider for CountingProvider {
        fn fetch_prices(&self, _ticker: &Ticker, _range: &DateRange) -> RegimeResult<PriceSeries> {
            self.calls.set(self.calls.get() + 1);
            Ok(prices(self.len))
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_compute_lengths() {
        let analysis = compute(Ticker::default(), RollingWindow::Days20, prices(100)).unwrap();

        assert_eq!(analysis.returns.len(), 99);
        assert_eq!(analysis.volatility.len(), 99);
        assert_eq!(analysis.labeled.len(), 99 - 19);
        assert_eq!(analysis.summary.total, analysis.labeled.len());
        assert_eq!(analysis.labeled_prices().len(), analysis.labeled.len());
        assert!(analysis.current_regime().is_some());
    }

    #[test]
    fn test_compute_insufficient() {
        let result = compute(Ticker::default(), RollingWindow::Days30, prices(1));
        assert!(matches!(result, Err(RegimeError::InsufficientData(_))));

        // 30 prices -> 29 returns, not enough for one 30-day window
        let result = compute(Ticker::default(), RollingWindow::Days30, prices(30));
        assert!(matches!(result, Err(RegimeError::InsufficientData(_))));

        let analysis = compute(Ticker::default(), RollingWindow::Days30, prices(31)).unwrap();
        assert_eq!(analysis.labeled.len(), 1);
        assert_eq!(analysis.labeled[0].regime, RegimeLabel::Low);
    }

    #[test]
    fn test_cached_analyzer_skips_provider() {
        let provider = CountingProvider { calls: Cell::new(0), len: 80 };
        let mut analyzer = CachedAnalyzer::new(provider, range(), None);
        let spy = Ticker::new("SPY");

        let first = analyzer.analyze(&spy, RollingWindow::Days20).unwrap();
        let second = analyzer.analyze(&Ticker::new("spy"), RollingWindow::Days20).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(analyzer.provider.calls.get(), 1);

        analyzer.analyze(&spy, RollingWindow::Days60).unwrap();
        assert_eq!(analyzer.provider.calls.get(), 2);
        assert_eq!(analyzer.cached_count(), 2);
    }

    #[test]
    fn test_failures_not_cached() {
        let provider = CountingProvider { calls: Cell::new(0), len: 5 };
        let mut analyzer = CachedAnalyzer::new(provider, range(), None);

        assert!(analyzer.analyze(&Ticker::default(), RollingWindow::Days30).is_err());
        assert!(analyzer.analyze(&Ticker::default(), RollingWindow::Days30).is_err());
        assert_eq!(analyzer.provider.calls.get(), 2);
        assert_eq!(analyzer.cached_count(), 0);
    }

    #[test]
    fn test_cache_ttl_expiry() {
        let mut cache = AnalysisCache::new(Some(Duration::ZERO));
        let analysis = compute(Ticker::default(), RollingWindow::Days20, prices(60)).unwrap();
        cache.insert(Arc::new(analysis));

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&Ticker::default(), RollingWindow::Days20).is_none());
    }

    #[test]
    fn test_cache_evicts_expired_on_insert() {
        let mut cache = AnalysisCache::new(Some(Duration::ZERO));
        for window in RollingWindow::ALL {
            let analysis = compute(Ticker::default(), window, prices(80)).unwrap();
            cache.insert(Arc::new(analysis));
            assert_eq!(cache.len(), 1);
        }

        let mut forever = AnalysisCache::new(None);
        for window in RollingWindow::ALL {
            let analysis = compute(Ticker::default(), window, prices(80)).unwrap();
            forever.insert(Arc::new(analysis));
        }
        assert_eq!(forever.len(), 3);
    }
}
