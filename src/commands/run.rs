//! Run command implementation

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};
use volatility_regimes::chart::{self, ChartOptions};
use volatility_regimes::data::{CsvPriceProvider, PriceProvider, YahooFetcher};
use volatility_regimes::{compute, Config, RegimeAnalysis, RegimeLabel, RollingWindow};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to configuration file (defaults to configs/default.json when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ticker symbol (overrides config file)
    #[arg(short, long)]
    pub ticker: Option<String>,

    /// Rolling window in trading days: 20, 30 or 60
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Chart output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Read <TICKER>.csv price files from this directory instead of Yahoo Finance
    #[arg(long)]
    pub prices_csv: Option<PathBuf>,
}

pub fn run(args: RunArgs) -> Result<()> {
    info!("Starting regime analysis");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(path) = &args.config {
        info!("Loaded configuration from: {}", path.display());
    }

    // Apply overrides
    if let Some(ticker) = args.ticker {
        info!("Overriding ticker to: {}", ticker);
        config.analysis.ticker = ticker;
    }

    if let Some(days) = args.window {
        info!("Overriding rolling window to: {} days", days);
        config.analysis.window = RollingWindow::try_from(days)?;
    }

    if let Some(start) = args.start {
        info!("Overriding start date to: {}", start);
        config.analysis.start_date = start;
    }

    if let Some(end) = args.end {
        info!("Overriding end date to: {}", end);
        config.analysis.end_date = Some(end);
    }

    if let Some(output) = args.output {
        info!("Overriding output path to: {}", output.display());
        config.output.path = output;
    }

    config.validate()?;

    let ticker = config.analysis.ticker();
    let range = config.analysis.date_range();
    let window = config.analysis.window;
    debug!("Analysis: {} {} to {} ({})", ticker, range.start, range.end, window);

    let provider: Box<dyn PriceProvider> = match &args.prices_csv {
        Some(dir) => {
            info!("Loading prices from: {}", dir.display());
            Box::new(CsvPriceProvider::new(dir))
        }
        None => Box::new(YahooFetcher::new(&config.fetch)?),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message(format!(
        "Fetching {} prices {} to {}",
        ticker, range.start, range.end
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let fetched = provider.fetch_prices(&ticker, &range);
    spinner.finish_and_clear();

    let prices = fetched.map_err(|e| {
        error!("{}: {}", e.title(), e);
        e
    })?;
    info!("Fetched {} trading days for {}", prices.len(), ticker);

    let analysis = compute(ticker, window, prices).map_err(|e| {
        error!("{}: {}", e.title(), e);
        e
    })?;

    print_summary(&analysis);

    let options = ChartOptions {
        width: config.output.width,
        height: config.output.height,
    };
    chart::render_svg(&analysis, &config.output.path, &options)
        .with_context(|| format!("Failed to write chart to {}", config.output.path.display()))?;

    println!("\nChart saved to: {}", config.output.path.display());
    Ok(())
}

fn print_summary(analysis: &RegimeAnalysis) {
    println!("\n{}", "=".repeat(60));
    println!("VOLATILITY REGIME SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Ticker:             {}", analysis.ticker);
    if let Some((first, last)) = analysis.date_span() {
        println!("Data Range:         {} to {}", first, last);
    }
    println!("Trading Days:       {}", analysis.prices.len());
    println!("Rolling Window:     {}", analysis.window);
    println!("{}", "-".repeat(60));

    for regime in RegimeLabel::ALL {
        let stats = analysis.summary.get(regime);
        let mean = stats
            .mean_volatility
            .map(|v| format!("{:.2}%", v * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:10} Volatility: {:5} days ({:5.2}%)  mean vol {}",
            regime.to_string(),
            stats.count,
            stats.percentage,
            mean
        );
    }

    println!("{}", "-".repeat(60));
    println!(
        "Thresholds:         p33 = {:.2}%, p67 = {:.2}%",
        analysis.thresholds.p33 * 100.0,
        analysis.thresholds.p67 * 100.0
    );
    if let Some(current) = analysis.current_regime() {
        println!("Current Regime:     {}", current);
    }
    println!("{}", "=".repeat(60));
}
