//! Caller authentication for event submissions.
//!
//! The trait is the seam: ingestion only asks "is this request allowed",
//! so the static shared-secret check can be replaced by a token cache,
//! signed-JWT validation, or an external auth service without touching
//! the pipeline.

use std::collections::HashMap;

pub(crate) const AUTH_TOKEN_HEADER: &str = "x-auth-token";

pub(crate) trait Authenticator: Send + Sync {
    /// Returns true when the request headers carry a valid credential.
    fn validate(&self, headers: Option<&HashMap<String, String>>) -> bool;
}

/// Compares `x-auth-token` against a fixed shared secret.
///
/// A placeholder scheme: no rotation, no per-client keys, no rate
/// limiting. Header names are matched case-insensitively; the token
/// value must match exactly.
pub(crate) struct StaticTokenAuthenticator {
    token: String,
}

impl StaticTokenAuthenticator {
    pub(crate) fn new(token: String) -> Self {
        Self { token }
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn validate(&self, headers: Option<&HashMap<String, String>>) -> bool {
        let Some(headers) = headers else {
            return false;
        };
        headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTH_TOKEN_HEADER))
            .is_some_and(|(_, value)| *value == self.token)
    }
}
