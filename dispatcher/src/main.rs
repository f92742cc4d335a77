mod generator;
mod runner;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::runner::{run, RunConfig};

const DEFAULT_BATCH_SIZE: usize = 20;
const DEFAULT_REQUESTS_PER_SECOND: f64 = 1.0;
const DEFAULT_CONCURRENT_WORKERS: usize = 5;
const DEFAULT_LOG_FILE: &str = "log_api_load_test_results.jsonl";

#[derive(Parser)]
#[command(author, version, about = "Load test tool for the event tracking API")]
struct Cli {
    /// URL of the ingestion endpoint
    #[arg(long)]
    url: String,

    /// Shared secret sent as the x-auth-token header
    #[arg(long)]
    auth_token: Option<String>,

    /// Number of events per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Requests per second issued by each worker
    #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_SECOND)]
    rps: f64,

    /// Number of parallel workers
    #[arg(long, default_value_t = DEFAULT_CONCURRENT_WORKERS)]
    workers: usize,

    /// File the per-request results are written to
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    print_test_summary(&cli);

    let config = RunConfig {
        url: cli.url,
        auth_token: cli.auth_token,
        batch_size: cli.batch_size,
        delay: delay_for_rps(cli.rps),
        workers: cli.workers,
        log_file: cli.log_file.clone(),
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nstopping the load test gracefully, waiting for in-flight requests...");
            signal_token.cancel();
        }
    });

    let attempts = run(config, shutdown).await?;

    println!("\nload test finished: {attempts} requests logged");
    println!("results saved in: {}", cli.log_file.display());
    Ok(())
}

/// Interval each worker waits between requests. A non-positive rate disables
/// the pause entirely.
fn delay_for_rps(rps: f64) -> Duration {
    if rps > 0.0 {
        Duration::try_from_secs_f64(1.0 / rps).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

fn print_test_summary(cli: &Cli) {
    let total_rps = cli.rps * cli.workers as f64;
    println!();
    println!("{}", "=".repeat(60));
    println!("EVENT TRACKING API LOAD TEST");
    println!("{}", "=".repeat(60));
    println!("API URL: {}", cli.url);
    println!("Batch size: {} events", cli.batch_size);
    println!("Parallel workers: {}", cli.workers);
    println!("Request rate: {total_rps:.2} req/s total");
    println!("Event rate: {:.2} events/s", total_rps * cli.batch_size as f64);
    println!("Log file: {}", cli.log_file.display());
    println!("{}", "=".repeat(60));
    println!("Press Ctrl+C to stop the test");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cli =
            Cli::parse_from(["batch-events-dispatcher", "--url", "http://localhost:9000/events"]);

        assert_eq!(cli.batch_size, 20);
        assert_eq!(cli.workers, 5);
        assert!((cli.rps - 1.0).abs() < f64::EPSILON);
        assert_eq!(cli.log_file, PathBuf::from("log_api_load_test_results.jsonl"));
        assert!(cli.auth_token.is_none());
    }

    #[test]
    fn auth_token_and_rates_are_configurable() {
        let cli = Cli::parse_from([
            "batch-events-dispatcher",
            "--url",
            "http://localhost:9000/events",
            "--auth-token",
            "secret",
            "--rps",
            "2.5",
            "--workers",
            "3",
        ]);

        assert_eq!(cli.auth_token.as_deref(), Some("secret"));
        assert!((cli.rps - 2.5).abs() < f64::EPSILON);
        assert_eq!(cli.workers, 3);
    }

    #[test]
    fn delay_is_the_inverse_of_the_rate() {
        assert_eq!(delay_for_rps(2.0), Duration::from_millis(500));
        assert_eq!(delay_for_rps(0.0), Duration::ZERO);
        assert_eq!(delay_for_rps(-1.0), Duration::ZERO);
    }
}
