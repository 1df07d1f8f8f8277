//! AWS Lambda entry point for MedFeeBot
//!
//! Deploy with `cargo lambda build --release --features lambda`.

use lambda_runtime::{Error as LambdaError, service_fn};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use log::LevelFilter;
use medfeebot::config::load_config;
use medfeebot::lambda::handler;

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    // RUST_LOG wins; otherwise the configured level. The handler reports
    // configuration errors on every invocation.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = load_config(None)
            .map(|config| config.logging.level_filter())
            .unwrap_or(LevelFilter::Info);
        EnvFilter::new(level.to_string().to_lowercase())
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("MedFeeBot Lambda starting...");
    lambda_runtime::run(service_fn(handler)).await
}
