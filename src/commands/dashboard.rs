//! Dashboard command implementation

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use volatility_regimes::dashboard::run_dashboard;
use volatility_regimes::Config;

pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    info!("Starting dashboard");

    let config = Config::load(config_path.as_deref())?;
    config.validate()?;
    info!(
        "Analysis range starts {}, cache TTL: {}",
        config.analysis.start_date,
        config
            .dashboard
            .cache_ttl_secs
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "none".to_string())
    );

    run_dashboard(&config)
}
