//! Body normalization and event-time defaulting.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// One event record: opaque key/value telemetry fields.
pub(crate) type EventRecord = Map<String, Value>;

pub(crate) const EVENT_TIME_FIELD: &str = "event_time";

/// Shapes a request body into an ordered batch of event records.
///
/// A JSON list is the batch as submitted; a single JSON object becomes a
/// batch of one. Anything else is outside the submission contract.
pub(crate) fn normalize_batch(body: Value) -> Result<Vec<EventRecord>, IngestError> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(IngestError::MalformedPayload(format!(
                    "event batch elements must be JSON objects, got {}",
                    json_type_name(&other)
                ))),
            })
            .collect(),
        Value::Object(record) => Ok(vec![record]),
        other => Err(IngestError::MalformedPayload(format!(
            "request body must be a JSON object or a list of objects, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Fills in `event_time` for records that did not supply one.
///
/// Stamps are taken per record; the contract does not require one shared
/// timestamp across a batch. Supplied values pass through untouched.
pub(crate) fn stamp_event_times(batch: &mut [EventRecord]) {
    for record in batch.iter_mut() {
        record
            .entry(EVENT_TIME_FIELD)
            .or_insert_with(|| Value::String(current_event_time()));
    }
}

fn current_event_time() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a nested list",
        Value::Object(_) => "an object",
    }
}
