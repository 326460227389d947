//! Submission Coordinator
//!
//! Submits the pending changelist of a zone, retrying transient failures
//! and rate limits with backoff. Terminal failures propagate immediately.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::api::{ApiClient, parse_json};
use crate::backoff::RetryConfig;
use crate::error::{ChangelistError, ChangelistResult};
use crate::observer::ProtocolEvent;
use crate::store::ChangeListStore;
use crate::transport::ApiResponse;
use crate::types::{SubmissionResult, SubmitRequest};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitOptions {
    /// Dry run: validate without committing or triggering activation.
    pub validate_only: bool,
    pub retry: RetryConfig,
    /// Wall-clock budget for the whole submission including retries.
    #[serde(rename = "timeoutMs", with = "crate::utils::duration_ms::option")]
    pub timeout: Option<Duration>,
}

impl SubmitOptions {
    pub fn validate_only() -> Self {
        Self {
            validate_only: true,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct SubmissionCoordinator {
    api: ApiClient,
    store: ChangeListStore,
}

impl SubmissionCoordinator {
    pub fn new(api: ApiClient, store: ChangeListStore) -> Self {
        Self { api, store }
    }

    pub async fn submit(
        &self,
        zone: &str,
        comment: &str,
        options: &SubmitOptions,
    ) -> ChangelistResult<SubmissionResult> {
        let started = Instant::now();
        let Some(budget) = options.timeout else {
            return self.submit_with_retry(zone, comment, options).await;
        };

        tokio::time::timeout(budget, self.submit_with_retry(zone, comment, options))
            .await
            .map_err(|_| ChangelistError::Timeout {
                zone: zone.to_string(),
                operation: "submission".to_string(),
                elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            })?
    }

    async fn submit_with_retry(
        &self,
        zone: &str,
        comment: &str,
        options: &SubmitOptions,
    ) -> ChangelistResult<SubmissionResult> {
        // Nothing is sent when there is nothing to submit
        let pending = self
            .with_retry(zone, "changelist read", &options.retry, move |_| {
                self.store.get_full(zone)
            })
            .await?;
        match pending {
            Some(pending) if !pending.changes.is_empty() => {}
            _ => {
                return Err(ChangelistError::EmptyTransaction {
                    zone: zone.to_string(),
                });
            }
        }

        let body = SubmitRequest {
            comment: comment.to_string(),
            validate_only: options.validate_only,
        };
        let body = &body;
        let path = self.api.submit_path(zone);
        let path = path.as_str();
        let validate_only = options.validate_only;

        let response = self
            .with_retry(zone, "submit", &options.retry, move |attempt| {
                self.api.emit(ProtocolEvent::SubmitAttempt {
                    zone: zone.to_string(),
                    attempt,
                    validate_only,
                });
                self.api.post_json(zone, path.to_string(), body)
            })
            .await?;
        self.accept(zone, &response, validate_only)
    }

    /// Run `call` until it succeeds, fails terminally or `retry` is spent.
    ///
    /// A rate limit that outlasts the budget becomes
    /// [`ChangelistError::RateLimitExhausted`].
    async fn with_retry<T, F, Fut>(
        &self,
        zone: &str,
        operation: &'static str,
        retry: &RetryConfig,
        mut call: F,
    ) -> ChangelistResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ChangelistResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match call(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    let delay = retry.retry_delay(&e, attempt);
                    self.api.emit(ProtocolEvent::RetryScheduled {
                        zone: zone.to_string(),
                        operation,
                        attempt,
                        delay,
                        reason: e.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(ChangelistError::RateLimited { retry_after, .. }) => {
                    return Err(ChangelistError::RateLimitExhausted {
                        zone: zone.to_string(),
                        attempts: attempt + 1,
                        retry_after,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn accept(
        &self,
        zone: &str,
        response: &ApiResponse,
        validate_only: bool,
    ) -> ChangelistResult<SubmissionResult> {
        let result = if response.has_body() {
            parse_json::<SubmissionResult>(&response.body)?
        } else {
            SubmissionResult::accepted_without_body()
        };

        if let Some(validation) = &result.validation_result
            && validation.has_errors()
        {
            return Err(ChangelistError::ValidationRejected {
                zone: zone.to_string(),
                errors: validation.errors.clone(),
                warnings: validation.warnings.clone(),
            });
        }

        for warning in result.warnings() {
            log::warn!("[{zone}] Validation warning: {warning}");
        }

        self.api.emit(ProtocolEvent::Submitted {
            zone: zone.to_string(),
            request_id: result.request_id.clone(),
            validate_only,
            warnings: result.warnings().len(),
        });
        Ok(result)
    }
}
