//! Garbage collection use case
//!
//! After a full reconciliation pass, every reachable row carries the
//! pass timestamp; anything older is no longer reachable from a
//! selected root and gets removed. The cutoff travels with the trigger
//! so a slow pass never collects its own rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{errors::ConnectorError, newtypes::ConnectorId};
use crate::ports::IMirrorStore;

/// Use case pruning unreachable mirrored rows
pub struct GarbageCollectUseCase {
    store: Arc<dyn IMirrorStore>,
}

impl GarbageCollectUseCase {
    /// Creates the use case with its store dependency
    pub fn new(store: Arc<dyn IMirrorStore>) -> Self {
        Self { store }
    }

    /// Deletes rows last touched before `active_before`
    ///
    /// Returns the number of rows removed.
    pub async fn execute(
        &self,
        connector_id: &ConnectorId,
        active_before: DateTime<Utc>,
    ) -> Result<u64, ConnectorError> {
        self.store
            .get_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
            .ok_or(ConnectorError::ConnectorNotFound(*connector_id))?;

        let removed = self
            .store
            .delete_files_not_upserted_since(connector_id, active_before)
            .await
            .map_err(ConnectorError::store)?;

        if removed > 0 {
            info!(
                connector_id = %connector_id,
                removed,
                "Garbage collection removed unreachable rows"
            );
        }

        Ok(removed)
    }
}
