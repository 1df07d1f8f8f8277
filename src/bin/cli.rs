//! MedFeeBot CLI
//!
//! Local execution entry point. For AWS Lambda, use `medfeebot-lambda`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use medfeebot::{
    config::load_config,
    error::Result,
    models::{Config, LoggingConfig},
    pipeline,
    services::resolve_sources,
    storage::open_state_store,
};

/// Exit code for runs that could not be set up at all.
const EXIT_SETUP: u8 = 2;

/// MedFeeBot - watches government pages and posts new items to Slack
#[derive(Parser, Debug)]
#[command(
    name = "medfeebot",
    version,
    about = "Notifies Slack about new ministry PDFs and council meetings"
)]
struct Cli {
    /// Path to a TOML config file (default: ./medfeebot.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every target once and notify about new items
    Run {
        /// Log notifications instead of posting them to Slack
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration and show the resolved sources
    Validate,

    /// Show persisted state
    State,
}

/// Install the logger at info until the configured level is known.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .format_timestamp_secs()
        .init();
    if !rust_log_set() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

/// Apply the configured level; `RUST_LOG` wins when set.
fn apply_log_level(logging: &LoggingConfig, verbose: bool) {
    if !rust_log_set() {
        log::set_max_level(logging.effective_level(verbose));
    }
}

fn rust_log_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            return ExitCode::from(EXIT_SETUP);
        }
    };
    apply_log_level(&config.logging, cli.verbose);

    match cli.command {
        Command::Run { dry_run } => run(&config, dry_run).await,
        Command::Validate => {
            validate(&config);
            ExitCode::SUCCESS
        }
        Command::State => match show_state(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("Failed to read state: {}", e);
                ExitCode::from(EXIT_SETUP)
            }
        },
    }
}

async fn run(config: &Config, dry_run: bool) -> ExitCode {
    log::info!("MedFeeBot check starting...");

    match pipeline::run_check(config, dry_run).await {
        Ok(report) if report.is_success() => {
            log::info!("Done! {} item(s) notified", report.notified_count());
            ExitCode::SUCCESS
        }
        Ok(report) => {
            log::error!(
                "{} source(s) failed",
                report.failures().count()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("Check could not start: {}", e);
            if !dry_run {
                pipeline::alert_setup_failure(config, &e).await;
            }
            ExitCode::from(EXIT_SETUP)
        }
    }
}

fn validate(config: &Config) {
    log::info!("✓ Config OK");

    let sources = resolve_sources(config);
    log::info!("{} of {} target(s) resolved:", sources.len(), config.targets.len());
    for source in &sources {
        log::info!("  - {} [{}] {}", source.name, source.kind(), source.url);
    }

    if config.slack.validate().is_err() {
        log::warn!("Slack token or channel missing; only `run --dry-run` will work");
    }
    match &config.storage.bucket {
        Some(bucket) => log::info!("State: s3://{}/{}", bucket, config.storage.prefix),
        None => log::info!("State: {}", config.storage.data_dir),
    }
}

async fn show_state(config: &Config) -> Result<()> {
    let store = open_state_store(&config.storage).await?;

    let known = store.load_known_urls().await?;
    log::info!("Known URLs ({}):", store.known_urls_location());
    if known.is_empty() {
        log::info!("  (none)");
    }
    for (source, urls) in &known {
        log::info!("  {}: {} URL(s)", source, urls.len());
    }

    let latest = store.load_latest_ids().await?;
    log::info!("Latest ids ({}):", store.latest_ids_location());
    if latest.is_empty() {
        log::info!("  (none)");
    }
    for (source, id) in &latest {
        log::info!("  {}: {}", source, id);
    }
    Ok(())
}
