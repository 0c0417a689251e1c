//! Price data loading
//!
//! Fetches daily adjusted closes from the Yahoo Finance chart API, or loads
//! them from CSV files for offline runs. Both sources sit behind the
//! `PriceProvider` trait so the pipeline never depends on a concrete source.

use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::{RegimeError, RegimeResult};
use crate::types::{DateRange, PricePoint, PriceSeries, Ticker};

// =============================================================================
// Provider trait
// =============================================================================

/// Source of daily adjusted close prices
pub trait PriceProvider {
    /// Fetch prices for `ticker` within `range`
    ///
    /// Returns `DataUnavailable` when the source has no rows for the request.
    fn fetch_prices(&self, ticker: &Ticker, range: &DateRange) -> RegimeResult<PriceSeries>;
}

impl<P: PriceProvider + ?Sized> PriceProvider for Box<P> {
    fn fetch_prices(&self, ticker: &Ticker, range: &DateRange) -> RegimeResult<PriceSeries> {
        (**self).fetch_prices(ticker, range)
    }
}

fn unavailable(ticker: &Ticker, range: &DateRange) -> RegimeError {
    RegimeError::DataUnavailable {
        ticker: ticker.to_string(),
        start: range.start,
        end: range.end,
    }
}

/// Sort, de-duplicate by date and build a series
fn into_series(mut points: Vec<PricePoint>) -> RegimeResult<PriceSeries> {
    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);
    PriceSeries::new(points)
}

// =============================================================================
// Yahoo Finance
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    #[serde(default)]
    adjclose: Vec<AdjCloseData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Daily price fetcher for the Yahoo Finance v8 chart endpoint
pub struct YahooFetcher {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl YahooFetcher {
    /// Create a fetcher from the fetch configuration
    pub fn new(config: &FetchConfig) -> RegimeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RegimeError::Parse(format!("base URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RegimeError::Parse(format!(
                "base URL {} cannot hold a path",
                config.base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Chart endpoint for a ticker; the symbol is one percent-encoded path segment
    pub fn chart_url(&self, ticker: &Ticker) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart"])
                .push(ticker.as_str());
        }
        url
    }

    /// Query parameters for an inclusive date range
    pub fn chart_query(range: &DateRange) -> [(&'static str, String); 5] {
        let period1 = range.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive, so extend to the end of the last day
        let period2 = range
            .end
            .succ_opt()
            .unwrap_or(range.end)
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        [
            ("interval", "1d".to_string()),
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("events", "div,split".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ]
    }

    /// Build the chart request for a ticker and range
    pub fn chart_request(
        &self,
        ticker: &Ticker,
        range: &DateRange,
    ) -> RegimeResult<reqwest::blocking::Request> {
        let query = Self::chart_query(range);
        let request = self
            .client
            .get(self.chart_url(ticker))
            .query(&query[..])
            .build()?;
        Ok(request)
    }
}

impl PriceProvider for YahooFetcher {
    fn fetch_prices(&self, ticker: &Ticker, range: &DateRange) -> RegimeResult<PriceSeries> {
        if ticker.is_empty() {
            return Err(unavailable(ticker, range));
        }

        let request = self.chart_request(ticker, range)?;
        info!("Fetching {} daily prices from {} to {}", ticker, range.start, range.end);
        debug!("Request URL: {}", request.url());

        let response = self.client.execute(request)?;
        let status = response.status();
        let body = response.text()?;

        let series = interpret_response(status, &body, ticker, range)?;
        info!("Fetched {} daily closes for {}", series.len(), ticker);
        Ok(series)
    }
}

/// Map a chart API status and body to prices within `range`
///
/// 404 and an empty result are `DataUnavailable`; any other non-success
/// status is `Network`.
pub fn interpret_response(
    status: StatusCode,
    body: &str,
    ticker: &Ticker,
    range: &DateRange,
) -> RegimeResult<PriceSeries> {
    if status == StatusCode::NOT_FOUND {
        warn!("Provider has no chart for {}", ticker);
        return Err(unavailable(ticker, range));
    }
    if !status.is_success() {
        return Err(RegimeError::Network(format!("provider returned status {}", status)));
    }

    let points: Vec<PricePoint> = parse_chart_response(body)?
        .into_iter()
        .filter(|p| range.contains(p.date))
        .collect();

    if points.is_empty() {
        return Err(unavailable(ticker, range));
    }

    into_series(points)
}

/// Parse a chart API payload into daily closes, preferring adjusted closes
///
/// A provider error of "Not Found" (unknown symbol) and a payload with no rows
/// both yield an empty vector; other provider errors are `Parse` errors.
pub fn parse_chart_response(body: &str) -> RegimeResult<Vec<PricePoint>> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| RegimeError::Parse(e.to_string()))?;

    if let Some(error) = response.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(Vec::new());
        }
        return Err(RegimeError::Parse(format!(
            "{} - {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let Some(data) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let adjusted = data.indicators.adjclose.into_iter().next().map(|a| a.adjclose);
    let closes = match adjusted {
        Some(values) if !values.is_empty() => values,
        _ => data
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    let mut points = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let Some(close) = closes.get(i).copied().flatten() else {
            continue;
        };
        let Some(datetime) = DateTime::from_timestamp(ts, 0) else {
            warn!("Skipping row with invalid timestamp {}", ts);
            continue;
        };
        points.push(PricePoint {
            date: datetime.date_naive(),
            close,
        });
    }

    Ok(points)
}

// =============================================================================
// CSV Data Loading
// =============================================================================

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    close: f64,
}

/// Load `date,close` rows from a CSV file
pub fn load_csv(path: impl AsRef<Path>) -> RegimeResult<Vec<PricePoint>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| RegimeError::Parse(format!("{}: {}", path.as_ref().display(), e)))?;

    let mut points = Vec::new();
    for (row_idx, result) in reader.deserialize::<PriceRow>().enumerate() {
        let row = result.map_err(|e| RegimeError::Parse(format!("row {}: {}", row_idx + 1, e)))?;
        points.push(PricePoint {
            date: row.date,
            close: row.close,
        });
    }

    Ok(points)
}

/// Offline provider reading `<data_dir>/<TICKER>.csv`
pub struct CsvPriceProvider {
    pub data_dir: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, ticker: &Ticker) -> PathBuf {
        self.data_dir.join(format!("{}.csv", ticker.as_str()))
    }
}

impl PriceProvider for CsvPriceProvider {
    fn fetch_prices(&self, ticker: &Ticker, range: &DateRange) -> RegimeResult<PriceSeries> {
        let path = self.path_for(ticker);
        if ticker.is_empty() || !path.exists() {
            warn!("Data file not found: {}", path.display());
            return Err(unavailable(ticker, range));
        }

        let points: Vec<PricePoint> = load_csv(&path)?
            .into_iter()
            .filter(|p| range.contains(p.date))
            .collect();

        if points.is_empty() {
            return Err(unavailable(ticker, range));
        }

        info!("Loaded {} daily closes for {} from {}", points.len(), ticker, path.display());
        into_series(points)
    }
}

// =============================================================================
// Data Validation
// =============================================================================

/// Validate a price series before computing returns
pub fn validate_prices(prices: &PriceSeries) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if prices.is_empty() {
        errors.push("No prices provided".to_string());
        return ValidationReport { errors, warnings };
    }

    for point in prices.points() {
        if point.close <= 0.0 || !point.close.is_finite() {
            errors.push(format!("{}: invalid close price ({})", point.date, point.close));
        }
    }

    for pair in prices.points().windows(2) {
        let gap = (pair[1].date - pair[0].date).num_days();
        if gap > 7 {
            warnings.push(format!(
                "{} day gap between {} and {}",
                gap, pair[0].date, pair[1].date
            ));
        }
    }

    ValidationReport { errors, warnings }
}

/// Result of price validation
#[derive(Debug)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
