//! Sync config mutation use case
//!
//! Toggle changes invalidate cached sync results: whenever a save
//! actually changes the stored config, a full resync is forced through
//! the orchestrator inbox.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{errors::ConnectorError, newtypes::ConnectorId, sync_config::SyncConfig};
use crate::orchestrator::OrchestratorHandle;
use crate::ports::IMirrorStore;

/// Use case persisting a connector's sync toggles
pub struct ConfigureSyncUseCase {
    store: Arc<dyn IMirrorStore>,
    orchestrator: OrchestratorHandle,
}

impl ConfigureSyncUseCase {
    /// Creates the use case with its dependencies
    pub fn new(store: Arc<dyn IMirrorStore>, orchestrator: OrchestratorHandle) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Saves the toggles; returns true if a full resync was forced
    pub async fn execute(
        &self,
        connector_id: &ConnectorId,
        csv_enabled: bool,
        pdf_enabled: bool,
    ) -> Result<bool, ConnectorError> {
        self.store
            .get_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
            .ok_or(ConnectorError::ConnectorNotFound(*connector_id))?;

        let current = self
            .store
            .get_sync_config(connector_id)
            .await
            .map_err(ConnectorError::store)?
            .unwrap_or_else(|| SyncConfig::new(*connector_id));

        let mut updated = current.clone();
        updated.set_csv_enabled(csv_enabled);
        updated.set_pdf_enabled(pdf_enabled);

        if !updated.differs_from(&current) {
            return Ok(false);
        }

        self.store
            .save_sync_config(&updated)
            .await
            .map_err(ConnectorError::store)?;

        info!(
            connector_id = %connector_id,
            csv_enabled,
            pdf_enabled,
            "Sync config changed, forcing full resync"
        );

        match self.orchestrator.request_full_sync(*connector_id, None) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(
                    connector_id = %connector_id,
                    error = %e,
                    "Resync handoff rejected after config change"
                );
                Ok(false)
            }
        }
    }
}
