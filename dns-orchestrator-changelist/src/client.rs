//! Zone changelist client
//!
//! Entry point for tool adapters. Wires the protocol components over one
//! transport and exposes the per-step operations plus
//! [`run_transaction`](ZoneChangelistClient::run_transaction), the full
//! resolve, stage, submit and activate pipeline.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::activation::{ActivationPoller, PollOptions};
use crate::api::ApiClient;
use crate::applier::ChangeApplier;
use crate::batch::{self, BatchOptions};
use crate::config::ChangelistConfig;
use crate::conflict::{ConflictResolver, Resolution};
use crate::error::{ChangelistError, ChangelistResult, TransportError};
use crate::http_client::{HttpTransport, HttpTransportConfig};
use crate::observer::{LogObserver, ProtocolObserver};
use crate::store::ChangeListStore;
use crate::submit::{SubmissionCoordinator, SubmitOptions};
use crate::transport::Transport;
use crate::types::{ActivationStatus, BatchResult, ChangeOperation, SubmissionResult};

/// Options of [`ZoneChangelistClient::run_transaction`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionOptions {
    pub comment: String,
    /// Discard a foreign pending changelist instead of reporting a conflict.
    pub force: bool,
    pub validate_only: bool,
    /// Wait for activation after a committed submission.
    pub await_activation: bool,
    #[serde(rename = "submitTimeoutMs", with = "crate::utils::duration_ms::option")]
    pub submit_timeout: Option<Duration>,
}

impl TransactionOptions {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    #[must_use]
    pub fn await_activation(mut self, await_activation: bool) -> Self {
        self.await_activation = await_activation;
        self
    }
}

/// Result of a completed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    pub resolution: TransactionResolution,
    pub submission: SubmissionResult,
    /// Set when activation was awaited.
    pub activation: Option<ActivationStatus>,
}

/// Serializable form of [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TransactionResolution {
    Clean,
    DiscardedEmpty,
    ForcedDiscard { discarded_changes: usize },
}

impl From<Resolution> for TransactionResolution {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Clean => Self::Clean,
            Resolution::DiscardedEmpty => Self::DiscardedEmpty,
            Resolution::ForcedDiscard { discarded_changes } => {
                Self::ForcedDiscard { discarded_changes }
            }
        }
    }
}

#[derive(Clone)]
pub struct ZoneChangelistClient {
    api: ApiClient,
    observer: Arc<dyn ProtocolObserver>,
    config: ChangelistConfig,
}

impl ZoneChangelistClient {
    pub fn from_transport(transport: Arc<dyn Transport>, config: ChangelistConfig) -> Self {
        let observer: Arc<dyn ProtocolObserver> = Arc::new(LogObserver);
        let api = ApiClient::new(transport)
            .with_base_path(&config.api_base_path)
            .with_observer(observer.clone());
        Self {
            api,
            observer,
            config,
        }
    }

    /// Client over a reqwest [`HttpTransport`].
    pub fn from_http_config(
        http: HttpTransportConfig,
        config: ChangelistConfig,
    ) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(http)?;
        Ok(Self::from_transport(Arc::new(transport), config))
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProtocolObserver>) -> Self {
        self.api = self.api.with_observer(observer.clone());
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ChangelistConfig {
        &self.config
    }

    pub fn store(&self) -> ChangeListStore {
        ChangeListStore::new(self.api.clone())
    }

    /// Submit options with the configured retry policy.
    pub fn submit_options(&self, validate_only: bool) -> SubmitOptions {
        SubmitOptions {
            validate_only,
            retry: self.config.retry.clone(),
            timeout: None,
        }
    }

    // ============ Protocol steps ============

    /// Make sure no pending changelist is in the way of a new transaction.
    pub async fn ensure_clean_change_list(
        &self,
        zone: &str,
        force: bool,
    ) -> ChangelistResult<Resolution> {
        ConflictResolver::new(self.store()).resolve(zone, force).await
    }

    pub async fn stage_change(
        &self,
        zone: &str,
        operation: &ChangeOperation,
    ) -> ChangelistResult<()> {
        ChangeApplier::new(self.api.clone())
            .apply(zone, operation)
            .await
    }

    /// Stage `operations` in order, stopping at the first failure.
    pub async fn stage_changes(
        &self,
        zone: &str,
        operations: &[ChangeOperation],
    ) -> ChangelistResult<()> {
        ChangeApplier::new(self.api.clone())
            .apply_all(zone, operations)
            .await
    }

    pub async fn submit_pending(
        &self,
        zone: &str,
        comment: &str,
        options: &SubmitOptions,
    ) -> ChangelistResult<SubmissionResult> {
        SubmissionCoordinator::new(self.api.clone(), self.store())
            .submit(zone, comment, options)
            .await
    }

    pub async fn await_activation(
        &self,
        zone: &str,
        options: &PollOptions,
    ) -> ChangelistResult<ActivationStatus> {
        ActivationPoller::new(self.api.clone())
            .await_activation(zone, options)
            .await
    }

    pub async fn process_zones<I, F, Fut, T, E>(
        &self,
        zones: I,
        operation: F,
        options: &BatchOptions,
    ) -> BatchResult
    where
        I: IntoIterator,
        I::Item: Into<String>,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        batch::process_zones(zones, operation, options, self.observer.as_ref()).await
    }

    /// [`process_zones`](Self::process_zones) with the configured
    /// [`BatchOptions`].
    pub async fn process_configured_zones<I, F, Fut, T, E>(
        &self,
        zones: I,
        operation: F,
    ) -> BatchResult
    where
        I: IntoIterator,
        I::Item: Into<String>,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.process_zones(zones, operation, &self.config.batch).await
    }

    // ============ Pipeline ============

    /// Resolve conflicts, stage `operations` in order, submit, and optionally
    /// wait for activation. A validate-only run never waits for activation.
    pub async fn run_transaction(
        &self,
        zone: &str,
        operations: &[ChangeOperation],
        options: &TransactionOptions,
    ) -> ChangelistResult<TransactionOutcome> {
        if operations.is_empty() {
            return Err(ChangelistError::EmptyTransaction {
                zone: zone.to_string(),
            });
        }

        let resolution = self.ensure_clean_change_list(zone, options.force).await?;
        if let Err(error) = self.stage_changes(zone, operations).await {
            // A half-staged changelist would block the next run as a conflict
            if let Err(cleanup) = self.store().discard(zone).await {
                log::warn!("[{zone}] Cleanup of partial changelist failed: {cleanup}");
            }
            return Err(error);
        }

        let submit_options = SubmitOptions {
            timeout: options.submit_timeout,
            ..self.submit_options(options.validate_only)
        };
        let submission = self
            .submit_pending(zone, &options.comment, &submit_options)
            .await?;

        let activation = if options.await_activation && !options.validate_only {
            Some(self.await_activation(zone, &self.config.poll).await?)
        } else {
            None
        };

        Ok(TransactionOutcome {
            resolution: resolution.into(),
            submission,
            activation,
        })
    }
}
