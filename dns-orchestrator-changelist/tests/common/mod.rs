//! Shared test tools: an in-memory changelist service

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dns_orchestrator_changelist::{
    ActivationState, ApiRequest, ApiResponse, ChangeOp, ChangeOperation, ChangelistConfig,
    DEFAULT_API_BASE_PATH, FieldError, HttpMethod, RecordChange, Transport, TransportError,
    ZoneChangelistClient,
};

/// Assert that a `Result` is `Ok` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// Assert that a `Result` is `Err` and return the error.
#[macro_export]
macro_rules! require_err {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_err(), "expected Err(..), got {res:?}");
        let Err(err) = res else {
            return;
        };
        err
    }};
}

pub const CALLER: &str = "automation";

/// `A` record set helper.
pub fn a_record(name: &str, address: &str) -> RecordChange {
    RecordChange {
        name: name.to_string(),
        record_type: "A".to_string(),
        ttl: 300,
        rdata: vec![address.to_string()],
    }
}

/// Client over `fake` with zero jitter and a short poll interval.
pub fn client(fake: &Arc<FakeChangelistService>) -> ZoneChangelistClient {
    let mut config = ChangelistConfig::default();
    config.retry.jitter = Duration::ZERO;
    config.poll.jitter = Duration::ZERO;
    config.poll.poll_interval = Duration::from_secs(1);
    config.poll.timeout = Duration::from_secs(60);
    config.batch.delay_between_zones = Duration::ZERO;
    ZoneChangelistClient::from_transport(fake.clone(), config)
}

// ============ Fake service ============

#[derive(Default)]
struct PendingList {
    last_modified_by: String,
    record_sets: Vec<RecordChange>,
}

#[derive(Default)]
struct ZoneState {
    pending: Option<PendingList>,
    committed: Vec<RecordChange>,
    activation: VecDeque<ActivationState>,
    validation_errors: Vec<FieldError>,
    validation_warnings: Vec<FieldError>,
    submissions: u32,
}

#[derive(Default)]
struct State {
    zones: HashMap<String, ZoneState>,
    /// One-shot responses that preempt normal handling, keyed by method and
    /// path relative to the API base. `None` lets one request through.
    injected: HashMap<(HttpMethod, String), VecDeque<Option<ApiResponse>>>,
    requests: Vec<ApiRequest>,
}

/// Stateful fake of the remote changelist service.
///
/// Enforces one pending changelist per zone, applies staged operations as
/// upserts, commits on submit and replays scripted activation states.
#[derive(Default)]
pub struct FakeChangelistService {
    state: Mutex<State>,
}

impl FakeChangelistService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pending changelist created by another user.
    pub async fn seed_pending(&self, zone: &str, user: &str, record_sets: Vec<RecordChange>) {
        self.state
            .lock()
            .await
            .zones
            .entry(zone.to_string())
            .or_default()
            .pending = Some(PendingList {
            last_modified_by: user.to_string(),
            record_sets,
        });
    }

    /// Activation states reported after a submission; the last one repeats.
    pub async fn script_activation(&self, zone: &str, states: &[ActivationState]) {
        self.state
            .lock()
            .await
            .zones
            .entry(zone.to_string())
            .or_default()
            .activation = states.iter().copied().collect();
    }

    pub async fn script_validation(
        &self,
        zone: &str,
        errors: Vec<FieldError>,
        warnings: Vec<FieldError>,
    ) {
        let mut state = self.state.lock().await;
        let zone = state.zones.entry(zone.to_string()).or_default();
        zone.validation_errors = errors;
        zone.validation_warnings = warnings;
    }

    /// Answer the next request to `relative_path` with `response`.
    pub async fn inject(&self, method: HttpMethod, relative_path: &str, response: ApiResponse) {
        self.state
            .lock()
            .await
            .injected
            .entry((method, relative_path.to_string()))
            .or_default()
            .push_back(Some(response));
    }

    /// Let the next request to `relative_path` reach the service, ahead of
    /// anything injected after it.
    pub async fn pass_through(&self, method: HttpMethod, relative_path: &str) {
        self.state
            .lock()
            .await
            .injected
            .entry((method, relative_path.to_string()))
            .or_default()
            .push_back(None);
    }

    pub async fn has_pending(&self, zone: &str) -> bool {
        self.state
            .lock()
            .await
            .zones
            .get(zone)
            .is_some_and(|z| z.pending.is_some())
    }

    pub async fn pending_records(&self, zone: &str) -> Vec<RecordChange> {
        self.state
            .lock()
            .await
            .zones
            .get(zone)
            .and_then(|z| z.pending.as_ref())
            .map(|p| p.record_sets.clone())
            .unwrap_or_default()
    }

    pub async fn committed(&self, zone: &str) -> Vec<RecordChange> {
        self.state
            .lock()
            .await
            .zones
            .get(zone)
            .map(|z| z.committed.clone())
            .unwrap_or_default()
    }

    /// `METHOD relative/path` of every request, in order.
    pub async fn request_log(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .map(|r| format!("{} {}", r.method, relative(&r.path)))
            .collect()
    }

    pub async fn requests_for_zone(&self, zone: &str) -> usize {
        let encoded = urlencoding::encode(zone).into_owned();
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| relative(&r.path).split('/').nth(1) == Some(encoded.as_str()))
            .count()
    }

    pub async fn count(&self, method: HttpMethod, relative_path: &str) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| r.method == method && relative(&r.path) == relative_path)
            .count()
    }
}

fn relative(path: &str) -> &str {
    path.strip_prefix(DEFAULT_API_BASE_PATH)
        .unwrap_or(path)
        .trim_start_matches('/')
}

fn not_found(detail: &str) -> ApiResponse {
    ApiResponse::json(
        404,
        &serde_json::json!({"title": "Not Found", "detail": detail}),
    )
}

fn ok_json(value: &serde_json::Value) -> ApiResponse {
    ApiResponse::json(200, value)
}

impl State {
    fn handle(&mut self, request: &ApiRequest) -> ApiResponse {
        let path = relative(&request.path).to_string();
        if let Some(Some(response)) = self
            .injected
            .get_mut(&(request.method, path.clone()))
            .and_then(VecDeque::pop_front)
        {
            return response;
        }

        let segments: Vec<&str> = path.split('/').collect();
        let Some(zone) = segments
            .get(1)
            .and_then(|z| urlencoding::decode(z).ok())
            .map(std::borrow::Cow::into_owned)
        else {
            return ApiResponse::new(400, "missing zone");
        };
        let state = self.zones.entry(zone.clone()).or_default();

        match (request.method, segments.as_slice()) {
            (HttpMethod::Get, ["changelists", _]) => match &state.pending {
                Some(pending) => ok_json(&serde_json::json!({
                    "zone": zone,
                    "changeTag": "7f1ff3b0-8cc2-4d52-a1de-4d1ab7a3d5e6",
                    "zoneVersionId": "0bd4bf6a-1b7c-4f9c-8b4c-2b5c7b0d8e11",
                    "lastModifiedDate": "2024-03-12T16:15:10Z",
                    "lastModifiedBy": pending.last_modified_by,
                    "stale": false
                })),
                None => not_found("No changelist for zone"),
            },
            (HttpMethod::Get, ["changelists", _, "recordsets"]) => match &state.pending {
                Some(pending) => ok_json(&serde_json::json!({
                    "zone": zone,
                    "recordSets": pending.record_sets,
                })),
                None => not_found("No changelist for zone"),
            },
            (HttpMethod::Delete, ["changelists", _]) => match state.pending.take() {
                Some(_) => ApiResponse::no_content(),
                None => not_found("No changelist for zone"),
            },
            (HttpMethod::Post, ["changelists", _, "recordsets", "add-change"]) => {
                let Some(operation) = request
                    .body
                    .clone()
                    .and_then(|b| serde_json::from_value::<ChangeOperation>(b).ok())
                else {
                    return ApiResponse::new(400, r#"{"title":"Malformed change"}"#);
                };
                let pending = state.pending.get_or_insert_with(|| PendingList {
                    last_modified_by: CALLER.to_string(),
                    record_sets: Vec::new(),
                });
                pending.last_modified_by = CALLER.to_string();
                pending.record_sets.retain(|r| {
                    !(r.name == operation.name && r.record_type == operation.record_type)
                });
                if operation.op != ChangeOp::Delete {
                    pending.record_sets.push(RecordChange {
                        name: operation.name,
                        record_type: operation.record_type,
                        ttl: operation.ttl.unwrap_or(300),
                        rdata: operation.rdata.unwrap_or_default(),
                    });
                }
                ApiResponse::no_content()
            }
            (HttpMethod::Post, ["changelists", _, "submit"]) => {
                let validate_only = request
                    .body
                    .as_ref()
                    .and_then(|b| b["validateOnly"].as_bool())
                    .unwrap_or(false);
                let Some(pending) = state.pending.as_ref() else {
                    return not_found("No changelist for zone");
                };
                state.submissions += 1;
                let request_id = format!("req-{}-{}", zone, state.submissions);

                if validate_only || !state.validation_errors.is_empty() {
                    return ok_json(&serde_json::json!({
                        "requestId": request_id,
                        "expiryDate": "2030-01-01T00:00:00Z",
                        "validationResult": {
                            "errors": state.validation_errors,
                            "warnings": state.validation_warnings,
                        }
                    }));
                }

                for record in &pending.record_sets {
                    state.committed.retain(|r| {
                        !(r.name == record.name && r.record_type == record.record_type)
                    });
                    state.committed.push(record.clone());
                }
                state.pending = None;
                ApiResponse::no_content()
            }
            (HttpMethod::Get, ["zones", _, "status"]) => {
                let current = if state.activation.len() > 1 {
                    state.activation.pop_front()
                } else {
                    state.activation.front().copied()
                }
                .unwrap_or(ActivationState::Active);
                let percentage = match current {
                    ActivationState::Active => 100,
                    ActivationState::Pending => 50,
                    ActivationState::Failed => 0,
                };
                ok_json(&serde_json::json!({
                    "activationState": current,
                    "propagationStatus": {"percentage": percentage}
                }))
            }
            _ => ApiResponse::new(405, "unsupported route"),
        }
    }
}

#[async_trait]
impl Transport for FakeChangelistService {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.lock().await;
        let response = state.handle(&request);
        state.requests.push(request);
        Ok(response)
    }
}
