//! Process configuration, read once at startup and injected into the
//! handler state rather than consulted ambiently per request.

use std::env;

/// Fallback destination bucket when `BUCKET_NAME` is unset.
pub(crate) const DEFAULT_BUCKET_NAME: &str = "saas-tracking-events";
/// Fallback shared secret when `AUTH_TOKEN` is unset. A deployment is
/// expected to override this; it exists so the function runs out of the box.
pub(crate) const DEFAULT_AUTH_TOKEN: &str = "qwe123-saas-tracking";

const BUCKET_NAME_VAR: &str = "BUCKET_NAME";
const AUTH_TOKEN_VAR: &str = "AUTH_TOKEN";

#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// Destination bucket for persisted event batches.
    pub(crate) bucket_name: String,
    /// Shared secret compared against the `x-auth-token` header.
    pub(crate) auth_token: String,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        Self {
            bucket_name: env_or(BUCKET_NAME_VAR, DEFAULT_BUCKET_NAME),
            auth_token: env_or(AUTH_TOKEN_VAR, DEFAULT_AUTH_TOKEN),
        }
    }
}

fn env_or(name: &str, fallback: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => fallback.to_string(),
    }
}
