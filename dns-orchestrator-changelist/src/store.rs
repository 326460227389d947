//! Change List Store
//!
//! Queries and discards the single pending changelist of a zone. "No pending
//! changelist" is a normal outcome and is returned as `None`, never as an
//! error. Transport failures propagate unmodified.

use crate::api::ApiClient;
use crate::error::{ChangelistError, ChangelistResult};
use crate::observer::ProtocolEvent;
use crate::types::{ChangeListMetadata, ChangeListRecordSet, PendingChangeList};

#[derive(Clone)]
pub struct ChangeListStore {
    api: ApiClient,
}

impl ChangeListStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Existence probe.
    pub async fn get_metadata(&self, zone: &str) -> ChangelistResult<Option<ChangeListMetadata>> {
        self.api
            .get_optional(zone, self.api.changelist_path(zone))
            .await
    }

    /// Metadata plus staged record sets.
    ///
    /// The changelist can be consumed between the two reads (submitted or
    /// discarded by another caller); that is reported as `None` as well.
    pub async fn get_full(&self, zone: &str) -> ChangelistResult<Option<PendingChangeList>> {
        let Some(metadata) = self.get_metadata(zone).await? else {
            return Ok(None);
        };

        let changes: Option<ChangeListRecordSet> = self
            .api
            .get_optional(zone, self.api.record_sets_path(zone))
            .await?;

        Ok(changes.map(|mut changes| {
            if changes.zone.is_empty() {
                changes.zone = zone.to_string();
            }
            PendingChangeList { metadata, changes }
        }))
    }

    /// Delete the pending changelist. Deleting a missing one succeeds.
    ///
    /// Returns whether a changelist existed.
    pub async fn discard(&self, zone: &str) -> ChangelistResult<bool> {
        let existed = match self.api.delete(zone, self.api.changelist_path(zone)).await {
            Ok(_) => true,
            Err(ChangelistError::NotFound { .. }) => false,
            Err(e) => return Err(e),
        };
        self.api.emit(ProtocolEvent::Discarded {
            zone: zone.to_string(),
            existed,
        });
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::test_utils::{
        RecordingObserver, ScriptedTransport, ZONE, api, script_absent, script_pending,
    };
    use crate::transport::{ApiResponse, HttpMethod};

    #[tokio::test]
    async fn metadata_not_found_is_none() {
        let transport = ScriptedTransport::new();
        let api = api(&transport, &RecordingObserver::new());
        script_absent(&transport, &api).await;

        let store = ChangeListStore::new(api);
        assert!(store.get_metadata(ZONE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_full_combines_metadata_and_record_sets() {
        let transport = ScriptedTransport::new();
        let api = api(&transport, &RecordingObserver::new());
        script_pending(&transport, &api, 3).await;

        let store = ChangeListStore::new(api);
        let pending = store.get_full(ZONE).await.unwrap().unwrap();
        assert_eq!(pending.metadata.last_modified_by.as_deref(), Some("userA"));
        assert_eq!(pending.changes.len(), 3);
        assert_eq!(pending.changes.record_sets[0].name, "host0.example.com");
    }

    #[tokio::test]
    async fn get_full_skips_record_sets_when_absent() {
        let transport = ScriptedTransport::new();
        let api = api(&transport, &RecordingObserver::new());
        script_absent(&transport, &api).await;

        let store = ChangeListStore::new(api.clone());
        assert!(store.get_full(ZONE).await.unwrap().is_none());
        assert_eq!(
            transport
                .count(HttpMethod::Get, &api.record_sets_path(ZONE))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn get_full_race_with_consumer_is_none() {
        let transport = ScriptedTransport::new();
        let api = api(&transport, &RecordingObserver::new());
        transport
            .on(
                HttpMethod::Get,
                &api.changelist_path(ZONE),
                ApiResponse::json(200, &crate::test_utils::metadata_json(ZONE, "userB")),
            )
            .await;
        transport
            .on(
                HttpMethod::Get,
                &api.record_sets_path(ZONE),
                ApiResponse::new(404, ""),
            )
            .await;

        let store = ChangeListStore::new(api);
        assert!(store.get_full(ZONE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn discard_missing_changelist_succeeds() {
        let transport = ScriptedTransport::new();
        let observer = RecordingObserver::new();
        let api = api(&transport, &observer);
        transport
            .on(
                HttpMethod::Delete,
                &api.changelist_path(ZONE),
                ApiResponse::new(404, r#"{"title":"Not Found"}"#),
            )
            .await;

        let store = ChangeListStore::new(api);
        assert!(!store.discard(ZONE).await.unwrap());
        assert_eq!(
            observer.events(),
            vec![ProtocolEvent::Discarded {
                zone: ZONE.into(),
                existed: false,
            }]
        );
    }

    #[tokio::test]
    async fn discard_existing_changelist() {
        let transport = ScriptedTransport::new();
        let api = api(&transport, &RecordingObserver::new());
        transport
            .on(
                HttpMethod::Delete,
                &api.changelist_path(ZONE),
                ApiResponse::no_content(),
            )
            .await;

        let store = ChangeListStore::new(api);
        assert!(store.discard(ZONE).await.unwrap());
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let transport = ScriptedTransport::new();
        let api = api(&transport, &RecordingObserver::new());
        transport
            .fail(
                HttpMethod::Get,
                &api.changelist_path(ZONE),
                TransportError::Network("connection reset".into()),
            )
            .await;

        let store = ChangeListStore::new(api);
        let err = store.get_metadata(ZONE).await.unwrap_err();
        assert!(matches!(err, ChangelistError::Transient { .. }));
    }
}
