//! Structured protocol events
//!
//! Every component receives an explicit [`ProtocolObserver`] and reports
//! what it does through it. [`LogObserver`] renders the events through the
//! `log` facade.

use std::time::Duration;

use crate::types::{ActivationState, ChangeOp};

/// What happened, for which zone, on which attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// The zone already had a non-empty changelist and `force` was not set.
    ConflictDetected {
        zone: String,
        staged_changes: usize,
        last_modified_by: Option<String>,
    },
    /// An existing changelist was discarded because the caller forced it.
    /// Audit trail for destroyed work.
    ForcedDiscard {
        zone: String,
        staged_changes: usize,
        last_modified_by: Option<String>,
    },
    /// A changelist was deleted; `existed` is false for an idempotent no-op.
    Discarded { zone: String, existed: bool },
    ChangeStaged {
        zone: String,
        name: String,
        record_type: String,
        op: ChangeOp,
    },
    SubmitAttempt {
        zone: String,
        attempt: u32,
        validate_only: bool,
    },
    RetryScheduled {
        zone: String,
        operation: &'static str,
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    Submitted {
        zone: String,
        request_id: String,
        validate_only: bool,
        warnings: usize,
    },
    ActivationPolled {
        zone: String,
        state: ActivationState,
        propagation: Option<u8>,
    },
    ActivationFinished {
        zone: String,
        state: ActivationState,
        elapsed: Duration,
    },
    ZoneProcessed {
        zone: String,
        index: usize,
        total: usize,
        success: bool,
    },
}

impl ProtocolEvent {
    pub fn zone(&self) -> &str {
        match self {
            Self::ConflictDetected { zone, .. }
            | Self::ForcedDiscard { zone, .. }
            | Self::Discarded { zone, .. }
            | Self::ChangeStaged { zone, .. }
            | Self::SubmitAttempt { zone, .. }
            | Self::RetryScheduled { zone, .. }
            | Self::Submitted { zone, .. }
            | Self::ActivationPolled { zone, .. }
            | Self::ActivationFinished { zone, .. }
            | Self::ZoneProcessed { zone, .. } => zone,
        }
    }

    /// Log level the event is rendered at by [`LogObserver`].
    pub fn level(&self) -> log::Level {
        match self {
            Self::ForcedDiscard { .. }
            | Self::ConflictDetected { .. }
            | Self::RetryScheduled { .. }
            | Self::ZoneProcessed { success: false, .. } => log::Level::Warn,
            Self::ActivationFinished {
                state: ActivationState::Failed,
                ..
            } => log::Level::Error,
            Self::ActivationPolled { .. } | Self::SubmitAttempt { .. } => log::Level::Debug,
            _ => log::Level::Info,
        }
    }
}

impl std::fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConflictDetected {
                zone,
                staged_changes,
                last_modified_by,
            } => write!(
                f,
                "[{zone}] Pending changelist blocks new transaction \
                 ({staged_changes} staged, last modified by {})",
                last_modified_by.as_deref().unwrap_or("unknown")
            ),
            Self::ForcedDiscard {
                zone,
                staged_changes,
                last_modified_by,
            } => write!(
                f,
                "[{zone}] Force-discarding pending changelist \
                 ({staged_changes} staged, last modified by {})",
                last_modified_by.as_deref().unwrap_or("unknown")
            ),
            Self::Discarded { zone, existed } => {
                if *existed {
                    write!(f, "[{zone}] Changelist discarded")
                } else {
                    write!(f, "[{zone}] No changelist to discard")
                }
            }
            Self::ChangeStaged {
                zone,
                name,
                record_type,
                op,
            } => write!(f, "[{zone}] Staged {} {name} {record_type}", op.as_str()),
            Self::SubmitAttempt {
                zone,
                attempt,
                validate_only,
            } => write!(
                f,
                "[{zone}] Submitting changelist (attempt {}, validate_only={validate_only})",
                attempt + 1
            ),
            Self::RetryScheduled {
                zone,
                operation,
                attempt,
                delay,
                reason,
            } => write!(
                f,
                "[{zone}] {operation} failed (attempt {}), retrying in {:.1}s: {reason}",
                attempt + 1,
                delay.as_secs_f32()
            ),
            Self::Submitted {
                zone,
                request_id,
                validate_only,
                warnings,
            } => write!(
                f,
                "[{zone}] Changelist {} (request {request_id}, {warnings} warnings)",
                if *validate_only { "validated" } else { "submitted" }
            ),
            Self::ActivationPolled {
                zone,
                state,
                propagation,
            } => match propagation {
                Some(p) => write!(f, "[{zone}] Activation {state:?} ({p}%)"),
                None => write!(f, "[{zone}] Activation {state:?}"),
            },
            Self::ActivationFinished {
                zone,
                state,
                elapsed,
            } => write!(
                f,
                "[{zone}] Activation finished as {state:?} after {:.1}s",
                elapsed.as_secs_f32()
            ),
            Self::ZoneProcessed {
                zone,
                index,
                total,
                success,
            } => write!(
                f,
                "[{zone}] Zone {}/{total} {}",
                index + 1,
                if *success { "succeeded" } else { "failed" }
            ),
        }
    }
}

/// Receiver of protocol events.
pub trait ProtocolObserver: Send + Sync {
    fn on_event(&self, event: &ProtocolEvent);
}

/// Default observer: forwards events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl LogObserver {
    const TARGET: &'static str = "dns_orchestrator_changelist";
}

impl ProtocolObserver for LogObserver {
    fn on_event(&self, event: &ProtocolEvent) {
        log::log!(target: Self::TARGET, event.level(), "{event}");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProtocolObserver for NoopObserver {
    fn on_event(&self, _event: &ProtocolEvent) {}
}
