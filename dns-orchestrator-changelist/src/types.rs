use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============ Changelist ============

/// Identity and version of a zone's pending changelist.
///
/// Returned by `GET /changelists/{zone}`. A `stale` changelist was built on
/// top of a zone version that is no longer current and should be refreshed
/// before it is mutated further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeListMetadata {
    /// Zone the changelist belongs to.
    pub zone: String,
    /// Time of the last staged operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
    /// User that staged the last operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    /// Opaque version token of the changelist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_tag: Option<String>,
    /// Zone version the changelist was branched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_version_id: Option<String>,
    #[serde(default)]
    pub stale: bool,
}

/// A single DNS resource record set as staged in a changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChange {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: u32,
    #[serde(default)]
    pub rdata: Vec<String>,
}

/// Full contents of a zone's pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeListRecordSet {
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub record_sets: Vec<RecordChange>,
}

impl ChangeListRecordSet {
    /// Number of staged record sets.
    pub fn len(&self) -> usize {
        self.record_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_sets.is_empty()
    }
}

/// A pending changelist: its metadata plus everything staged in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChangeList {
    pub metadata: ChangeListMetadata,
    pub changes: ChangeListRecordSet,
}

// ============ Change Operations ============

/// Kind of edit applied to a record set.
///
/// `Add` behaves as an upsert on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Add,
    Edit,
    Delete,
}

impl ChangeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Edit => "EDIT",
            Self::Delete => "DELETE",
        }
    }
}

/// One atomic edit sent to the `add-change` endpoint.
///
/// Wire format: `{name, type, op, ttl?, rdata?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOperation {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub op: ChangeOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdata: Option<Vec<String>>,
}

impl ChangeOperation {
    /// Create or replace the record set `name`/`record_type`.
    pub fn add(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: u32,
        rdata: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            op: ChangeOp::Add,
            ttl: Some(ttl),
            rdata: Some(rdata),
        }
    }

    pub fn edit(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: u32,
        rdata: Vec<String>,
    ) -> Self {
        Self {
            op: ChangeOp::Edit,
            ..Self::add(name, record_type, ttl, rdata)
        }
    }

    /// Remove the record set identified by `name`/`record_type`.
    pub fn delete(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            op: ChangeOp::Delete,
            ttl: None,
            rdata: None,
        }
    }
}

// ============ Submission ============

/// Body of `POST /changelists/{zone}/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub comment: String,
    pub validate_only: bool,
}

/// A field-level message reported by the remote validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub errors: Vec<FieldError>,
    #[serde(default)]
    pub warnings: Vec<FieldError>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub request_id: String,
    pub expiry_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ValidationResult>,
}

impl SubmissionResult {
    /// Result used when the service accepts a submission with `204 No Content`.
    pub fn accepted_without_body() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            expiry_date: Utc::now() + chrono::TimeDelta::hours(24),
            validation_result: None,
        }
    }

    pub fn warnings(&self) -> &[FieldError] {
        self.validation_result
            .as_ref()
            .map_or(&[][..], |v| v.warnings.as_slice())
    }
}

// ============ Activation ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivationState {
    Pending,
    Active,
    Failed,
}

impl ActivationState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Body of `GET /zones/{zone}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationStatus {
    pub activation_state: ActivationState,
    /// Propagation progress in percent, if the service reports it.
    #[serde(
        rename = "propagationStatus",
        default,
        deserialize_with = "deserialize_propagation",
        skip_serializing_if = "Option::is_none"
    )]
    pub propagation_percentage: Option<u8>,
}

/// The service reports propagation either as a bare number or as
/// `{"percentage": n, ...}`.
fn deserialize_propagation<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Propagation {
        Percentage(u8),
        Detailed {
            #[serde(default)]
            percentage: Option<u8>,
        },
    }

    Ok(
        match Option::<Propagation>::deserialize(deserializer)? {
            Some(Propagation::Percentage(p)) => Some(p),
            Some(Propagation::Detailed { percentage }) => percentage,
            None => None,
        }
        .map(|p| p.min(100)),
    )
}

// ============ Batch ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchZoneFailure {
    pub zone: String,
    pub error: String,
}

/// Per-zone outcome of a batch run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub successful: Vec<String>,
    pub failed: Vec<BatchZoneFailure>,
}

impl BatchResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}
