//! Test helpers
//!
//! Scripted transport and recording observer for unit tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::TransportError;
use crate::observer::{ProtocolEvent, ProtocolObserver};
use crate::transport::{ApiRequest, ApiResponse, HttpMethod, Transport};

pub const ZONE: &str = "example.com";

type Reply = Result<ApiResponse, TransportError>;

// ===== ScriptedTransport =====

/// Replies from per-route queues. The last reply of a queue repeats once
/// the queue is drained; unscripted routes answer HTTP 501.
pub struct ScriptedTransport {
    routes: RwLock<HashMap<(HttpMethod, String), VecDeque<Reply>>>,
    requests: RwLock<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: RwLock::new(HashMap::new()),
            requests: RwLock::new(Vec::new()),
        })
    }

    pub async fn on(&self, method: HttpMethod, path: &str, reply: ApiResponse) {
        self.push(method, path, Ok(reply)).await;
    }

    pub async fn fail(&self, method: HttpMethod, path: &str, error: TransportError) {
        self.push(method, path, Err(error)).await;
    }

    async fn push(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.routes
            .write()
            .await
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub async fn requests(&self) -> Vec<ApiRequest> {
        self.requests.read().await.clone()
    }

    pub async fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let key = (request.method, request.path.clone());
        self.requests.write().await.push(request);

        let mut routes = self.routes.write().await;
        let Some(queue) = routes.get_mut(&key) else {
            return Ok(ApiResponse::new(501, format!("unscripted {} {}", key.0, key.1)));
        };
        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Ok(ApiResponse::new(501, "")))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(ApiResponse::new(501, "")))
        }
    }
}

// ===== RecordingObserver =====

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProtocolEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ProtocolEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProtocolObserver for RecordingObserver {
    fn on_event(&self, event: &ProtocolEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ===== Factories =====

pub fn api(transport: &Arc<ScriptedTransport>, observer: &Arc<RecordingObserver>) -> ApiClient {
    ApiClient::new(transport.clone()).with_observer(observer.clone())
}

pub fn metadata_json(zone: &str, last_modified_by: &str) -> serde_json::Value {
    serde_json::json!({
        "zone": zone,
        "changeTag": "476754f4-d605-479f-853b-db854d7254fa",
        "zoneVersionId": "1d9c887c-49bb-4382-87a6-d1bf690aa58f",
        "lastModifiedDate": "2024-03-12T16:15:10Z",
        "lastModifiedBy": last_modified_by,
        "stale": false
    })
}

/// `count` staged `A` records named `host{i}.{zone}`.
pub fn record_sets_json(zone: &str, count: usize) -> serde_json::Value {
    let sets: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "name": format!("host{i}.{zone}"),
                "type": "A",
                "ttl": 300,
                "rdata": [format!("192.0.2.{}", i + 1)]
            })
        })
        .collect();
    serde_json::json!({ "zone": zone, "recordSets": sets })
}

/// Script a pending changelist with `count` staged records.
pub async fn script_pending(transport: &ScriptedTransport, api: &ApiClient, count: usize) {
    transport
        .on(
            HttpMethod::Get,
            &api.changelist_path(ZONE),
            ApiResponse::json(200, &metadata_json(ZONE, "userA")),
        )
        .await;
    transport
        .on(
            HttpMethod::Get,
            &api.record_sets_path(ZONE),
            ApiResponse::json(200, &record_sets_json(ZONE, count)),
        )
        .await;
}

/// Script a zone without pending changelist.
pub async fn script_absent(transport: &ScriptedTransport, api: &ApiClient) {
    transport
        .on(
            HttpMethod::Get,
            &api.changelist_path(ZONE),
            ApiResponse::new(404, ""),
        )
        .await;
}
