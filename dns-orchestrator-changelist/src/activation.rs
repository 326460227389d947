//! Activation Poller
//!
//! Waits for a submitted changelist to reach `ACTIVE` or `FAILED`. The
//! whole wait is bounded by a deadline; running out of time is reported as
//! [`ChangelistError::Timeout`], never as a pending status.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::api::ApiClient;
use crate::backoff::random_jitter;
use crate::error::{ChangelistError, ChangelistResult};
use crate::observer::ProtocolEvent;
use crate::types::{ActivationState, ActivationStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollOptions {
    /// Overall wall-clock budget.
    #[serde(rename = "timeoutMs", with = "crate::utils::duration_ms")]
    pub timeout: Duration,
    #[serde(rename = "pollIntervalMs", with = "crate::utils::duration_ms")]
    pub poll_interval: Duration,
    /// Failed polls in a row before giving up.
    pub max_consecutive_errors: u32,
    /// Cap of the interval multiplier. It doubles after each failed poll and
    /// stays in effect for later pending polls.
    pub max_backoff_multiplier: u32,
    /// Upper bound of the random jitter added after a failed poll.
    #[serde(rename = "jitterMs", with = "crate::utils::duration_ms")]
    pub jitter: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15 * 60),
            poll_interval: Duration::from_secs(10),
            max_consecutive_errors: 3,
            max_backoff_multiplier: 10,
            jitter: Duration::from_secs(1),
        }
    }
}

impl PollOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct ActivationPoller {
    api: ApiClient,
}

impl ActivationPoller {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Poll until the zone leaves `PENDING`.
    ///
    /// Returns the `ACTIVE` status, or [`ChangelistError::ActivationFailed`]
    /// when the service rejects the activation.
    pub async fn await_activation(
        &self,
        zone: &str,
        options: &PollOptions,
    ) -> ChangelistResult<ActivationStatus> {
        let started = Instant::now();
        tokio::time::timeout_at(started + options.timeout, self.poll(zone, options, started))
            .await
            .map_err(|_| {
                log::warn!(
                    "[{zone}] Activation still pending after {:.1}s",
                    started.elapsed().as_secs_f32()
                );
                ChangelistError::Timeout {
                    zone: zone.to_string(),
                    operation: "activation".to_string(),
                    elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                }
            })?
    }

    async fn poll(
        &self,
        zone: &str,
        options: &PollOptions,
        started: Instant,
    ) -> ChangelistResult<ActivationStatus> {
        let path = self.api.status_path(zone);
        let mut multiplier: u32 = 1;
        let mut consecutive_errors: u32 = 0;

        loop {
            match self
                .api
                .get_json::<ActivationStatus>(zone, path.clone())
                .await
            {
                Ok(status) => {
                    // The multiplier survives a success; only the error streak resets
                    consecutive_errors = 0;
                    self.api.emit(ProtocolEvent::ActivationPolled {
                        zone: zone.to_string(),
                        state: status.activation_state,
                        propagation: status.propagation_percentage,
                    });

                    if status.activation_state.is_terminal() {
                        self.api.emit(ProtocolEvent::ActivationFinished {
                            zone: zone.to_string(),
                            state: status.activation_state,
                            elapsed: started.elapsed(),
                        });
                        if status.activation_state == ActivationState::Failed {
                            return Err(ChangelistError::ActivationFailed {
                                zone: zone.to_string(),
                            });
                        }
                        return Ok(status);
                    }

                    tokio::time::sleep(options.poll_interval.saturating_mul(multiplier)).await;
                }
                Err(e) if e.is_retryable() => {
                    consecutive_errors += 1;
                    if consecutive_errors >= options.max_consecutive_errors {
                        return Err(ChangelistError::PollAborted {
                            zone: zone.to_string(),
                            consecutive_errors,
                            last_error: e.to_string(),
                        });
                    }

                    multiplier = multiplier
                        .saturating_mul(2)
                        .min(options.max_backoff_multiplier.max(1));
                    let mut delay = options.poll_interval.saturating_mul(multiplier)
                        + random_jitter(options.jitter);
                    if let Some(secs) = e.retry_after() {
                        delay = delay.max(Duration::from_secs(secs));
                    }

                    self.api.emit(ProtocolEvent::RetryScheduled {
                        zone: zone.to_string(),
                        operation: "activation poll",
                        attempt: consecutive_errors - 1,
                        delay,
                        reason: e.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
