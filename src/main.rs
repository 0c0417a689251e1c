//! Volatility regimes - main entry point
//!
//! This binary provides two subcommands:
//! - run: Fetch prices, classify regimes, write the chart (default)
//! - dashboard: Open the interactive regime dashboard

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "volatility-regimes")]
#[command(about = "Rolling volatility regime analysis with static and interactive charts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the analysis once and write the regime chart
    Run(commands::run::RunArgs),

    /// Open the interactive dashboard
    #[cfg(feature = "dashboard")]
    Dashboard {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn,eframe=warn,egui_glow=warn,winit=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Run(commands::run::RunArgs::default()));

    let command_name = match &command {
        Commands::Run(_) => "run",
        #[cfg(feature = "dashboard")]
        Commands::Dashboard { .. } => "dashboard",
    };

    setup_logging(cli.verbose, command_name)?;

    match command {
        Commands::Run(args) => commands::run::run(args),
        #[cfg(feature = "dashboard")]
        Commands::Dashboard { config } => commands::dashboard::run(config),
    }
}
