//! API boundary
//!
//! [`ApiClient`] is the only place where HTTP status codes are inspected.
//! Every response leaves this module either as a successful [`ApiResponse`]
//! or as a tagged [`ChangelistError`].

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ChangelistError, ChangelistResult, TransportError};
use crate::observer::{LogObserver, ProtocolEvent, ProtocolObserver};
use crate::transport::{ApiRequest, ApiResponse, HttpMethod, Transport};
use crate::types::{FieldError, ValidationResult};
use crate::utils::body_preview::preview;

/// Default API prefix of the changelist service.
pub const DEFAULT_API_BASE_PATH: &str = "/config-dns/v2";

/// Shared handle to the transport plus the path layout of the service.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_path: Arc<str>,
    observer: Arc<dyn ProtocolObserver>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_path: Arc::from(DEFAULT_API_BASE_PATH),
            observer: Arc::new(LogObserver),
        }
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = Arc::from(base_path.trim_end_matches('/'));
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProtocolObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn emit(&self, event: ProtocolEvent) {
        self.observer.on_event(&event);
    }

    // ============ Paths ============

    pub fn changelist_path(&self, zone: &str) -> String {
        format!("{}/changelists/{}", self.base_path, urlencoding::encode(zone))
    }

    pub fn record_sets_path(&self, zone: &str) -> String {
        format!("{}/recordsets", self.changelist_path(zone))
    }

    pub fn add_change_path(&self, zone: &str) -> String {
        format!("{}/recordsets/add-change", self.changelist_path(zone))
    }

    pub fn submit_path(&self, zone: &str) -> String {
        format!("{}/submit", self.changelist_path(zone))
    }

    pub fn status_path(&self, zone: &str) -> String {
        format!("{}/zones/{}/status", self.base_path, urlencoding::encode(zone))
    }

    // ============ Requests ============

    /// Send a request and classify the response.
    pub async fn send(&self, zone: &str, request: ApiRequest) -> ChangelistResult<ApiResponse> {
        let path = request.path.clone();
        let response = self
            .transport
            .request(request)
            .await
            .map_err(|e| transport_error(zone, e))?;
        classify(zone, &path, response)
    }

    /// GET and decode; a 404 comes back as `None`.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        zone: &str,
        path: String,
    ) -> ChangelistResult<Option<T>> {
        match self.send(zone, ApiRequest::new(HttpMethod::Get, path)).await {
            Ok(response) => parse_json(&response.body).map(Some),
            Err(ChangelistError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        zone: &str,
        path: String,
    ) -> ChangelistResult<T> {
        let response = self
            .send(zone, ApiRequest::new(HttpMethod::Get, path))
            .await?;
        parse_json(&response.body)
    }

    pub async fn post_json<B: serde::Serialize>(
        &self,
        zone: &str,
        path: String,
        body: &B,
    ) -> ChangelistResult<ApiResponse> {
        let value =
            serde_json::to_value(body).map_err(|e| ChangelistError::Serialization(e.to_string()))?;
        self.send(zone, ApiRequest::new(HttpMethod::Post, path).with_body(value))
            .await
    }

    pub async fn delete(&self, zone: &str, path: String) -> ChangelistResult<ApiResponse> {
        self.send(zone, ApiRequest::new(HttpMethod::Delete, path))
            .await
    }
}

// ============ Classification ============

fn transport_error(zone: &str, error: TransportError) -> ChangelistError {
    ChangelistError::Transient {
        zone: zone.to_string(),
        detail: error.to_string(),
    }
}

/// Map an HTTP response onto the error taxonomy.
pub(crate) fn classify(
    zone: &str,
    path: &str,
    response: ApiResponse,
) -> ChangelistResult<ApiResponse> {
    let status = response.status;
    if response.is_success() {
        return Ok(response);
    }

    let problem = ProblemDetails::parse(&response.body);
    let message = problem
        .as_ref()
        .and_then(ProblemDetails::message)
        .unwrap_or_else(|| preview(&response.body).to_string());

    let error = match status {
        404 => ChangelistError::NotFound {
            path: path.to_string(),
        },
        409 => ChangelistError::RemoteConflict {
            zone: zone.to_string(),
            message,
        },
        429 => ChangelistError::RateLimited {
            zone: zone.to_string(),
            retry_after: response.retry_after,
            message: Some(message),
        },
        408 | 502..=504 => ChangelistError::Transient {
            zone: zone.to_string(),
            detail: format!("HTTP {status}: {message}"),
        },
        400 | 422 => match problem.map(ProblemDetails::into_validation) {
            Some(validation) if validation.has_errors() => ChangelistError::ValidationRejected {
                zone: zone.to_string(),
                errors: validation.errors,
                warnings: validation.warnings,
            },
            _ => ChangelistError::Terminal {
                zone: zone.to_string(),
                status,
                message,
            },
        },
        _ => ChangelistError::Terminal {
            zone: zone.to_string(),
            status,
            message,
        },
    };

    if error.is_expected() || error.is_retryable() {
        log::warn!("[{zone}] {error}");
    } else {
        log::error!("[{zone}] {error}");
    }
    Err(error)
}

/// Decode a JSON body into `T`.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> ChangelistResult<T> {
    serde_json::from_str(body).map_err(|e| {
        log::error!("JSON parse failed: {e}");
        log::error!("Raw response: {}", preview(body));
        ChangelistError::Parse(e.to_string())
    })
}

/// `application/problem+json` error body, plus the service's
/// `validationResult` extension.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemDetails {
    title: Option<String>,
    detail: Option<String>,
    #[serde(default)]
    errors: Vec<ProblemField>,
    validation_result: Option<ValidationResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemField {
    #[serde(alias = "fieldName")]
    field: Option<String>,
    title: Option<String>,
    detail: Option<String>,
    message: Option<String>,
}

impl ProblemDetails {
    fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn message(&self) -> Option<String> {
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => Some(format!("{title}: {detail}")),
            (Some(msg), None) | (None, Some(msg)) => Some(msg.clone()),
            (None, None) => None,
        }
    }

    fn into_validation(self) -> ValidationResult {
        let mut validation = self.validation_result.unwrap_or_default();
        validation
            .errors
            .extend(self.errors.into_iter().map(|f| FieldError {
                field: f.field.unwrap_or_default(),
                message: f.detail.or(f.message).or(f.title).unwrap_or_default(),
            }));
        validation
    }
}
