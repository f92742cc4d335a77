//! Error taxonomy for the ingestion pipeline.
//!
//! Every failure is converted to a structured HTTP response at the handler
//! boundary; callers can rely on a single response parser for all outcomes.

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::put_object::PutObjectError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum IngestError {
    /// Missing or mismatched `x-auth-token` header.
    #[error("Unauthorized: missing or invalid x-auth-token header")]
    Unauthorized,

    /// Body is not JSON text, or not an object / list of objects.
    #[error("{0}")]
    MalformedPayload(String),

    /// The object store rejected or failed the batch write.
    #[error("failed to write event batch: {}", DisplayErrorContext(.0))]
    Persistence(#[from] SdkError<PutObjectError>),
}

impl IngestError {
    pub(crate) fn status_code(&self) -> i64 {
        match self {
            Self::Unauthorized => 401,
            Self::MalformedPayload(_) | Self::Persistence(_) => 500,
        }
    }

    /// Message placed in the JSON response body.
    ///
    /// Authentication failures keep their own prefix; everything else is
    /// reported as a processing error so callers see a stable shape.
    pub(crate) fn response_message(&self) -> String {
        match self {
            Self::Unauthorized => self.to_string(),
            other => format!("Error processing events: {other}"),
        }
    }

    /// Whether the caller may safely retry the same request.
    ///
    /// Writes are create-only, so a failed persistence attempt has not
    /// partially applied. Credential and payload errors need a fixed
    /// request, not a retry.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
