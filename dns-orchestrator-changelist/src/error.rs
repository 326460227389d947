//! Unified error type definition

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conflict::ConflictReport;
use crate::types::FieldError;

/// Failure below the HTTP layer, as reported by a [`Transport`](crate::Transport).
///
/// Both variants are transient and become [`ChangelistError::Transient`] at
/// the API boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail")]
pub enum TransportError {
    /// Connection refused/reset, DNS resolution failure, broken body stream...
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the transport's timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// Error taxonomy of the changelist protocol.
///
/// Produced once at the API boundary from HTTP status codes; everything
/// downstream switches on the variant rather than on message text.
///
/// # Retryable Errors
///
/// - [`Transient`](Self::Transient): connection failures, timeouts, 408/502/503/504
/// - [`RateLimited`](Self::RateLimited): a single HTTP 429
///
/// The submission coordinator and the activation poller retry these with
/// backoff and only surface them (or [`RateLimitExhausted`](Self::RateLimitExhausted))
/// once their retry budget is spent.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code", content = "details")]
pub enum ChangelistError {
    /// Another pending changelist blocks the new transaction.
    #[error("{}", .0.headline())]
    Conflict(Box<ConflictReport>),

    /// The remote service answered HTTP 409.
    #[error("Changelist conflict on zone '{zone}': {message}")]
    RemoteConflict { zone: String, message: String },

    /// Submit attempted with no pending changelist or no staged changes.
    #[error("Nothing to submit: zone '{zone}' has no staged changes")]
    EmptyTransaction { zone: String },

    /// Network reset, timeout or 408/502/503/504.
    #[error("Transient error on zone '{zone}': {detail}")]
    Transient { zone: String, detail: String },

    /// HTTP 429 with the server's `retry-after` hint in seconds, if any.
    #[error("Rate limited on zone '{zone}'")]
    RateLimited {
        zone: String,
        retry_after: Option<u64>,
        message: Option<String>,
    },

    /// Still rate limited after every retry was spent.
    #[error("Rate limit exhausted on zone '{zone}' after {attempts} attempts")]
    RateLimitExhausted {
        zone: String,
        attempts: u32,
        retry_after: Option<u64>,
    },

    /// The remote validator refused the changelist.
    #[error("Validation rejected for zone '{zone}': {}", join_field_errors(.errors))]
    ValidationRejected {
        zone: String,
        errors: Vec<FieldError>,
        warnings: Vec<FieldError>,
    },

    /// The caller's time budget ran out; remote state is unknown.
    #[error("Timed out after {elapsed_ms}ms waiting for {operation} on zone '{zone}'")]
    Timeout {
        zone: String,
        operation: String,
        elapsed_ms: u64,
    },

    /// Activation reached the `FAILED` state.
    #[error("Activation failed for zone '{zone}'")]
    ActivationFailed { zone: String },

    /// Polling gave up after too many consecutive transient errors.
    #[error(
        "Activation polling aborted for zone '{zone}' after {consecutive_errors} \
         consecutive errors: {last_error}"
    )]
    PollAborted {
        zone: String,
        consecutive_errors: u32,
        last_error: String,
    },

    /// HTTP 404. Only the store treats this as a normal outcome.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Any other non-retryable status.
    #[error("Request for zone '{zone}' failed with HTTP {status}: {message}")]
    Terminal {
        zone: String,
        status: u16,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ChangelistError {
    /// Whether a retry with backoff may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }

    /// Whether the error is an expected outcome (caller input, remote state),
    /// used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when
    /// returning `false`.
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_)
                | Self::RemoteConflict { .. }
                | Self::EmptyTransaction { .. }
                | Self::ValidationRejected { .. }
                | Self::NotFound { .. }
                | Self::ActivationFailed { .. }
        )
    }

    /// Both locally detected and remote-reported conflicts.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::RemoteConflict { .. })
    }

    /// Server hint for rate-limited errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. }
            | Self::RateLimitExhausted { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Convenience type alias for `Result<T, ChangelistError>`.
pub type ChangelistResult<T> = std::result::Result<T, ChangelistError>;
