//! Change Operation Applier
//!
//! Appends one operation to the zone's pending changelist; the remote
//! service creates the changelist on the first append.
//!
//! Staging is not retried here. An append is not idempotent unless the
//! service deduplicates by content, so a blind retry after an ambiguous
//! failure could stage the same edit twice. Callers that know better can
//! wrap [`ChangeApplier::apply`] in their own retry loop.

use crate::api::ApiClient;
use crate::error::ChangelistResult;
use crate::observer::ProtocolEvent;
use crate::types::ChangeOperation;

#[derive(Clone)]
pub struct ChangeApplier {
    api: ApiClient,
}

impl ChangeApplier {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn apply(&self, zone: &str, operation: &ChangeOperation) -> ChangelistResult<()> {
        self.api
            .post_json(zone, self.api.add_change_path(zone), operation)
            .await?;
        self.api.emit(ProtocolEvent::ChangeStaged {
            zone: zone.to_string(),
            name: operation.name.clone(),
            record_type: operation.record_type.clone(),
            op: operation.op,
        });
        Ok(())
    }

    /// Apply `operations` one after another in caller order, stopping at the
    /// first failure.
    pub async fn apply_all(
        &self,
        zone: &str,
        operations: &[ChangeOperation],
    ) -> ChangelistResult<()> {
        for operation in operations {
            self.apply(zone, operation).await?;
        }
        Ok(())
    }
}
