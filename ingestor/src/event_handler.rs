//! Event ingestion handler: authenticate, normalize, stamp, persist.
//!
//! One invocation per inbound request. Every exit path returns a structured
//! JSON response with permissive CORS headers; failures never escape to the
//! runtime as function errors.

use std::collections::HashMap;

use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::ApiGatewayProxyResponse;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::Utc;
use http::{header, HeaderMap, HeaderValue};
use lambda_runtime::{tracing, Error, LambdaEvent};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{Authenticator, StaticTokenAuthenticator};
use crate::batch::{normalize_batch, stamp_event_times};
use crate::config::Config;
use crate::error::IngestError;
use crate::partition::partition_key;

/// Invocation payload for an event submission.
///
/// Structurally a subset of an API Gateway proxy event: through the gateway
/// the body arrives as JSON text, while direct invocations may supply it
/// pre-parsed as an object or list.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct IngestRequest {
    pub(crate) headers: Option<HashMap<String, String>>,
    pub(crate) body: Option<Value>,
}

/// Dependencies wired once at startup and shared across invocations.
pub(crate) struct AppState {
    s3_client: S3Client,
    bucket_name: String,
    authenticator: Box<dyn Authenticator>,
}

impl AppState {
    pub(crate) fn new(s3_client: S3Client, config: Config) -> Self {
        let authenticator = Box::new(StaticTokenAuthenticator::new(config.auth_token));
        Self {
            s3_client,
            bucket_name: config.bucket_name,
            authenticator,
        }
    }
}

pub(crate) async fn function_handler(
    event: LambdaEvent<IngestRequest>,
    state: &AppState,
) -> Result<ApiGatewayProxyResponse, Error> {
    let request = event.payload;

    if !state.authenticator.validate(request.headers.as_ref()) {
        tracing::warn!("rejected event submission: missing or invalid auth token");
        return Ok(error_response(&IngestError::Unauthorized));
    }

    match ingest_batch(request.body, state).await {
        Ok(events_count) => Ok(success_response(events_count)),
        Err(error) => {
            tracing::error!(error = %error, retryable = error.is_retryable(), "failed to process event batch");
            Ok(error_response(&error))
        }
    }
}

/// Normalizes the submitted body, stamps missing event times and writes the
/// batch to its partitioned object. Returns the number of events written.
async fn ingest_batch(body: Option<Value>, state: &AppState) -> Result<usize, IngestError> {
    let raw = body
        .ok_or_else(|| IngestError::MalformedPayload("request body is missing".to_string()))?;
    let parsed = match raw {
        Value::String(text) => serde_json::from_str(&text).map_err(|err| {
            IngestError::MalformedPayload(format!("request body is not valid JSON: {err}"))
        })?,
        already_parsed => already_parsed,
    };

    let mut batch = normalize_batch(parsed)?;
    stamp_event_times(&mut batch);

    let received_at = Utc::now();
    let key = partition_key(received_at);
    let payload = serde_json::to_vec(&batch).map_err(|err| {
        IngestError::MalformedPayload(format!("failed to serialize event batch: {err}"))
    })?;

    state
        .s3_client
        .put_object()
        .bucket(&state.bucket_name)
        .key(&key)
        .content_type("application/json")
        .body(ByteStream::from(payload))
        .send()
        .await?;

    tracing::info!(key = %key, events_count = batch.len(), "event batch persisted");
    Ok(batch.len())
}

fn success_response(events_count: usize) -> ApiGatewayProxyResponse {
    json_response(
        200,
        json!({
            "message": "Events processed successfully",
            "events_count": events_count,
        }),
    )
}

fn error_response(error: &IngestError) -> ApiGatewayProxyResponse {
    json_response(error.status_code(), json!({ "message": error.response_message() }))
}

fn json_response(status_code: i64, body: Value) -> ApiGatewayProxyResponse {
    ApiGatewayProxyResponse {
        status_code,
        headers: response_headers(),
        multi_value_headers: HeaderMap::new(),
        body: Some(Body::Text(body.to_string())),
        is_base64_encoded: false,
    }
}

fn response_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type,X-Auth-Token"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("OPTIONS,POST"));
    headers
}
