use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{run, service_fn, tracing, Error};

mod auth;
mod batch;
mod config;
mod error;
mod event_handler;
mod partition;

use config::Config;
use event_handler::{function_handler, AppState};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::subscriber::fmt().json().init();
    let config = Config::from_env();
    tracing::info!(bucket_name = %config.bucket_name, "starting event ingestor");
    let shared_config = aws_config::load_defaults(BehaviorVersion::v2025_01_17()).await;
    let state = AppState::new(S3Client::new(&shared_config), config);
    run(service_fn(|event| function_handler(event, &state))).await
}
