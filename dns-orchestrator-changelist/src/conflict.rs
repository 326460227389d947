//! Conflict Resolver
//!
//! Runs before any new mutation sequence on a zone. The remote service
//! allows one pending changelist per zone; a foreign non-empty changelist
//! is reported to the caller instead of being overwritten, unless the
//! caller explicitly forces a discard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChangelistError, ChangelistResult};
use crate::observer::ProtocolEvent;
use crate::store::ChangeListStore;
use crate::types::{PendingChangeList, RecordChange};

/// Number of staged changes included in a conflict report.
pub const CONFLICT_PREVIEW_LIMIT: usize = 10;

/// What the caller can do about a blocking changelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChoice {
    /// Submit the existing changelist as-is.
    SubmitExisting,
    /// Re-run with `force` to discard it and continue.
    DiscardAndContinue,
    /// Leave the zone untouched.
    Abort,
}

impl ConflictChoice {
    pub const ALL: [Self; 3] = [Self::SubmitExisting, Self::DiscardAndContinue, Self::Abort];

    pub fn description(self) -> &'static str {
        match self {
            Self::SubmitExisting => "submit the existing changelist",
            Self::DiscardAndContinue => "discard the existing changelist and continue (force)",
            Self::Abort => "abort and leave the zone untouched",
        }
    }
}

/// Details of a pending changelist that blocks a new transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub zone: String,
    pub last_modified_by: Option<String>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub change_tag: Option<String>,
    pub stale: bool,
    pub total_changes: usize,
    /// First [`CONFLICT_PREVIEW_LIMIT`] staged changes.
    pub preview: Vec<RecordChange>,
    pub choices: Vec<ConflictChoice>,
}

impl ConflictReport {
    pub fn from_pending(pending: &PendingChangeList) -> Self {
        let metadata = &pending.metadata;
        Self {
            zone: pending.changes.zone.clone(),
            last_modified_by: metadata.last_modified_by.clone(),
            last_modified_date: metadata.last_modified_date,
            change_tag: metadata.change_tag.clone(),
            stale: metadata.stale,
            total_changes: pending.changes.len(),
            preview: pending
                .changes
                .record_sets
                .iter()
                .take(CONFLICT_PREVIEW_LIMIT)
                .cloned()
                .collect(),
            choices: ConflictChoice::ALL.to_vec(),
        }
    }

    /// Changes not included in the preview.
    pub fn remaining(&self) -> usize {
        self.total_changes.saturating_sub(self.preview.len())
    }

    pub fn headline(&self) -> String {
        format!(
            "Zone '{}' already has a pending changelist with {} staged change(s) \
             (last modified by {})",
            self.zone,
            self.total_changes,
            self.last_modified_by.as_deref().unwrap_or("unknown")
        )
    }

    /// Caller-facing guidance: metadata, preview, and the available choices.
    pub fn summary(&self) -> String {
        let mut lines = vec![self.headline()];
        if let Some(date) = self.last_modified_date {
            lines.push(format!("Last modified: {}", date.to_rfc3339()));
        }
        if self.stale {
            lines.push("The changelist is stale and must be refreshed before submitting.".into());
        }
        lines.push("Staged changes:".into());
        lines.extend(self.preview.iter().map(|change| {
            format!(
                "  {} {} {} {}",
                change.name,
                change.record_type,
                change.ttl,
                change.rdata.join(" ")
            )
        }));
        if self.remaining() > 0 {
            lines.push(format!("  +{} more", self.remaining()));
        }
        lines.push("Options:".into());
        lines.extend(
            self.choices
                .iter()
                .enumerate()
                .map(|(i, choice)| format!("  {}. {}", i + 1, choice.description())),
        );
        lines.join("\n")
    }
}

/// How the zone was made ready for staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No pending changelist existed.
    Clean,
    /// An empty changelist was found and discarded.
    DiscardedEmpty,
    /// A non-empty changelist was discarded because `force` was set.
    ForcedDiscard { discarded_changes: usize },
}

#[derive(Clone)]
pub struct ConflictResolver {
    store: ChangeListStore,
}

impl ConflictResolver {
    pub fn new(store: ChangeListStore) -> Self {
        Self { store }
    }

    /// Leave the zone without a pending changelist, or report the one in
    /// the way.
    pub async fn resolve(&self, zone: &str, force: bool) -> ChangelistResult<Resolution> {
        let Some(pending) = self.store.get_full(zone).await? else {
            return Ok(Resolution::Clean);
        };

        if pending.changes.is_empty() {
            self.store.discard(zone).await?;
            return Ok(Resolution::DiscardedEmpty);
        }

        let staged_changes = pending.changes.len();
        let last_modified_by = pending.metadata.last_modified_by.clone();

        if !force {
            self.store.api().emit(ProtocolEvent::ConflictDetected {
                zone: zone.to_string(),
                staged_changes,
                last_modified_by,
            });
            let mut report = ConflictReport::from_pending(&pending);
            report.zone = zone.to_string();
            return Err(ChangelistError::Conflict(Box::new(report)));
        }

        self.store.api().emit(ProtocolEvent::ForcedDiscard {
            zone: zone.to_string(),
            staged_changes,
            last_modified_by,
        });
        self.store.discard(zone).await?;
        Ok(Resolution::ForcedDiscard {
            discarded_changes: staged_changes,
        })
    }
}
