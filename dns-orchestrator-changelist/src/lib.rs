//! # dns-orchestrator-changelist
//!
//! Client-side transaction protocol for authoritative DNS services that
//! batch record edits into a per-zone *changelist*: stage changes, submit
//! them atomically, then wait for activation.
//!
//! The remote service allows at most one pending changelist per zone. This
//! crate detects a foreign pending changelist before mutating a zone,
//! retries submission and polling through rate limits and transient
//! failures, and reports every step as a structured [`ProtocolEvent`].
//!
//! ## Feature Flags
//!
//! ### TLS Backend
//!
//! - **`native-tls`** *(default)* — Use the platform's native TLS implementation.
//! - **`rustls`** — Use rustls. Recommended for cross-compilation and Android targets.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dns_orchestrator_changelist::{
//!     ChangeOperation, ChangelistConfig, HttpTransportConfig, TransactionOptions,
//!     ZoneChangelistClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http = HttpTransportConfig::new("https://dns.example.net")
//!         .with_header("Authorization", "Bearer your-token");
//!     let client = ZoneChangelistClient::from_http_config(http, ChangelistConfig::default())?;
//!
//!     let operations = vec![
//!         ChangeOperation::add("www.example.com", "A", 300, vec!["192.0.2.10".into()]),
//!         ChangeOperation::delete("old.example.com", "CNAME"),
//!     ];
//!     let options = TransactionOptions::new("rotate web frontends").await_activation(true);
//!
//!     let outcome = client.run_transaction("example.com", &operations, &options).await?;
//!     println!("submitted as {}", outcome.submission.request_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Step by Step
//!
//! ```rust,no_run
//! # use dns_orchestrator_changelist::*;
//! # async fn example(client: ZoneChangelistClient) -> ChangelistResult<()> {
//! client.ensure_clean_change_list("example.com", false).await?;
//! client
//!     .stage_change(
//!         "example.com",
//!         &ChangeOperation::add("api.example.com", "A", 60, vec!["192.0.2.20".into()]),
//!     )
//!     .await?;
//! let _submission = client
//!     .submit_pending("example.com", "add api", &client.submit_options(false))
//!     .await?;
//! let _status = client
//!     .await_activation("example.com", &client.config().poll)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`ChangelistResult<T>`]. The error enum is produced
//! once from HTTP status codes and carries structured detail:
//!
//! - [`ChangelistError::Conflict`] — a pending changelist blocks the zone; carries a
//!   [`ConflictReport`]
//! - [`ChangelistError::EmptyTransaction`] — nothing staged, nothing sent
//! - [`ChangelistError::ValidationRejected`] — field-level errors from the remote validator
//! - [`ChangelistError::Timeout`] — the caller's budget ran out; remote state unknown
//!
//! Transient errors and rate limits are retried with exponential backoff
//! during submission and activation polling. Staging is never retried.

mod activation;
mod api;
mod applier;
mod backoff;
mod batch;
mod client;
mod config;
mod conflict;
mod error;
mod http_client;
mod observer;
mod store;
mod submit;
mod transport;
mod types;
mod utils;

#[cfg(test)]
mod test_utils;

// Re-export error types
pub use error::{ChangelistError, ChangelistResult, TransportError};

// Re-export the client facade
pub use client::{
    TransactionOptions, TransactionOutcome, TransactionResolution, ZoneChangelistClient,
};
pub use config::ChangelistConfig;

// Re-export protocol components
pub use activation::{ActivationPoller, PollOptions};
pub use api::{ApiClient, DEFAULT_API_BASE_PATH};
pub use applier::ChangeApplier;
pub use backoff::RetryConfig;
pub use batch::{BatchOptions, process_zones};
pub use conflict::{
    CONFLICT_PREVIEW_LIMIT, ConflictChoice, ConflictReport, ConflictResolver, Resolution,
};
pub use store::ChangeListStore;
pub use submit::{SubmissionCoordinator, SubmitOptions};

// Re-export transport layer
pub use http_client::{HttpTransport, HttpTransportConfig};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, Transport};

// Re-export observability
pub use observer::{LogObserver, NoopObserver, ProtocolEvent, ProtocolObserver};

// Re-export types
pub use types::{
    ActivationState, ActivationStatus, BatchResult, BatchZoneFailure, ChangeListMetadata,
    ChangeListRecordSet, ChangeOp, ChangeOperation, FieldError, PendingChangeList, RecordChange,
    SubmissionResult, SubmitRequest, ValidationResult,
};

// Re-export backoff helpers
pub use backoff::{base_delay, delay as backoff_delay};
