//! AWS Lambda entry point for bls-ingest
//!
//! Deploy with `cargo lambda build --release --features lambda`.
//! Set `CONFIG_PATH` to the configuration location (usually `s3://...`).

use lambda_runtime::{Error as LambdaError, service_fn};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("bls-ingest Lambda starting...");
    lambda_runtime::run(service_fn(bls_ingest::lambda::handler)).await
}
