//! Load workers and the results log writer.
//!
//! Each worker pushes one batch per interval and reports every attempt over a
//! channel to a single writer task, which appends JSON lines to the log file.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::generator::random_batch;

const AUTH_TOKEN_HEADER: &str = "x-auth-token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RESPONSE_TEXT_LIMIT: usize = 200;

/// Settings for one load run, resolved from the command line.
#[derive(Debug, Clone)]
pub(crate) struct RunConfig {
    pub(crate) url: String,
    pub(crate) auth_token: Option<String>,
    pub(crate) batch_size: usize,
    pub(crate) delay: Duration,
    pub(crate) workers: usize,
    pub(crate) log_file: PathBuf,
}

/// One request attempt, as appended to the results log.
#[derive(Debug, Serialize)]
pub(crate) struct AttemptRecord {
    timestamp: String,
    batch_size: usize,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Drives the whole run: spawns the writer and the workers, waits for both.
///
/// Returns the number of attempts logged once every worker has stopped.
pub(crate) async fn run(config: RunConfig, shutdown: CancellationToken) -> Result<u64> {
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let (results_tx, results_rx) = mpsc::channel(config.workers.max(1) * 2);
    let writer = tokio::spawn(write_results(results_rx, config.log_file.clone()));

    let mut workers = JoinSet::new();
    for _ in 0..config.workers {
        workers.spawn(run_worker(
            client.clone(),
            config.clone(),
            results_tx.clone(),
            shutdown.clone(),
        ));
    }
    drop(results_tx);

    while let Some(joined) = workers.join_next().await {
        if let Err(error) = joined {
            eprintln!("worker task failed: {error}");
        }
    }

    writer.await.context("result writer task panicked")?
}

/// Sends batches until cancelled, pausing `delay` between attempts.
pub(crate) async fn run_worker(
    client: Client,
    config: RunConfig,
    results: mpsc::Sender<AttemptRecord>,
    shutdown: CancellationToken,
) {
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let record = send_batch(&client, &config).await;
        print_attempt(&record);
        if results.send(record).await.is_err() {
            // writer is gone, nothing left to record
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(config.delay) => {}
            () = shutdown.cancelled() => break,
        }
    }
}

/// Sends one random batch and captures the outcome, HTTP or transport.
async fn send_batch(client: &Client, config: &RunConfig) -> AttemptRecord {
    let events = random_batch(config.batch_size);
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let started = Instant::now();

    let mut request = client.post(&config.url).json(&events);
    if let Some(token) = config.auth_token.as_deref() {
        request = request.header(AUTH_TOKEN_HEADER, token);
    }

    match request.send().await {
        Ok(response) => {
            let status = response.status();
            let body = read_response_body(response).await;
            AttemptRecord {
                timestamp,
                batch_size: config.batch_size,
                duration_ms: elapsed_ms(started),
                status_code: Some(status.as_u16()),
                success: status == StatusCode::OK,
                response: Some(body),
                error: None,
            }
        }
        Err(error) => AttemptRecord {
            timestamp,
            batch_size: config.batch_size,
            duration_ms: elapsed_ms(started),
            status_code: None,
            success: false,
            response: None,
            error: Some(error.to_string()),
        },
    }
}

/// Appends each received attempt as one JSON line, creating the file fresh.
async fn write_results(
    mut results: mpsc::Receiver<AttemptRecord>,
    log_file: PathBuf,
) -> Result<u64> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
    }
    let mut file = File::create(&log_file)
        .await
        .with_context(|| format!("failed to create log file {}", log_file.display()))?;

    let mut written = 0u64;
    while let Some(record) = results.recv().await {
        let mut line =
            serde_json::to_string(&record).context("failed to encode result record")?;
        line.push('\n');
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to append to {}", log_file.display()))?;
        written += 1;
    }
    file.flush()
        .await
        .with_context(|| format!("failed to flush {}", log_file.display()))?;
    Ok(written)
}

async fn read_response_body(response: reqwest::Response) -> Value {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text)
        .unwrap_or_else(|_| Value::String(truncate(&text, RESPONSE_TEXT_LIMIT)))
}

fn print_attempt(record: &AttemptRecord) {
    let seconds = record.duration_ms as f64 / 1000.0;
    if let Some(status) = record.status_code {
        println!(
            "[{}] batch sent: {} events, status: {status}, took {seconds:.3}s",
            record.timestamp, record.batch_size
        );
    } else {
        let error = record.error.as_deref().unwrap_or("request failed");
        println!("[{}] ERROR: {error}, took {seconds:.3}s", record.timestamp);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn test_config(url: &str, log_file: PathBuf) -> RunConfig {
        RunConfig {
            url: url.to_string(),
            auth_token: Some("qwe123-saas-tracking".to_string()),
            batch_size: 3,
            delay: Duration::from_millis(10),
            workers: 1,
            log_file,
        }
    }

    fn temp_log_path() -> PathBuf {
        std::env::temp_dir().join(format!("dispatcher_results_{}.jsonl", Uuid::new_v4().simple()))
    }

    #[test]
    fn success_record_serializes_without_error_field() {
        let record = AttemptRecord {
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            batch_size: 20,
            duration_ms: 132,
            status_code: Some(200),
            success: true,
            response: Some(serde_json::json!({"message": "ok", "events_count": 20})),
            error: None,
        };

        let line: Value = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(line["status_code"], 200);
        assert_eq!(line["success"], true);
        assert_eq!(line["duration_ms"], 132);
        assert!(line.get("error").is_none());
    }

    #[test]
    fn failure_record_serializes_without_response_fields() {
        let record = AttemptRecord {
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            batch_size: 20,
            duration_ms: 5,
            status_code: None,
            success: false,
            response: None,
            error: Some("connection refused".to_string()),
        };

        let line: Value = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(line["success"], false);
        assert_eq!(line["error"], "connection refused");
        assert!(line.get("status_code").is_none());
        assert!(line.get("response").is_none());
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(300);
        let truncated = truncate(&text, 200);
        assert_eq!(truncated.chars().count(), 200);
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_a_failure_record() {
        let client = Client::new();
        let config = test_config("http://127.0.0.1:9/events", temp_log_path());

        let record = send_batch(&client, &config).await;

        assert!(!record.success);
        assert!(record.status_code.is_none());
        assert!(record.error.is_some());
        assert_eq!(record.batch_size, 3);
    }

    #[tokio::test]
    async fn writer_appends_one_json_line_per_attempt() {
        let path = temp_log_path();
        let (tx, rx) = mpsc::channel(4);
        let writer = tokio::spawn(write_results(rx, path.clone()));

        for duration_ms in [10, 20] {
            let record = AttemptRecord {
                timestamp: "2025-01-01T00:00:00Z".to_string(),
                batch_size: 2,
                duration_ms,
                status_code: Some(200),
                success: true,
                response: None,
                error: None,
            };
            tx.send(record).await.unwrap();
        }
        drop(tx);

        let written = writer.await.unwrap().unwrap();
        assert_eq!(written, 2);

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["batch_size"], 2);
        }
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn cancelled_worker_stops_without_sending_requests() {
        let client = Client::new();
        let config = test_config("http://127.0.0.1:9/events", temp_log_path());
        let (tx, mut rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        run_worker(client, config, tx, shutdown).await;

        assert!(rx.recv().await.is_none());
    }
}
