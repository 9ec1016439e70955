//! Permission change use case
//!
//! Grants and revocations arrive as a raw map of node id to permission
//! value. The whole batch is validated before anything mutates; the
//! apply phase is then best-effort per item. When at least one change
//! lands, a full resync is handed to the orchestrator inbox and the
//! call returns without waiting for it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    errors::ConnectorError,
    mirror::{FolderSyncState, MirroredFolder},
    newtypes::{ConnectorId, NodeId},
};
use crate::orchestrator::OrchestratorHandle;
use crate::ports::IMirrorStore;

/// A validated permission value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionValue {
    Read,
    None,
}

impl PermissionValue {
    fn parse(node_id: &str, value: &str) -> Result<Self, ConnectorError> {
        match value {
            "read" => Ok(PermissionValue::Read),
            "none" => Ok(PermissionValue::None),
            other => Err(ConnectorError::InvalidPermission {
                node_id: node_id.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// What a permission-change batch actually did
#[derive(Debug, Default)]
pub struct PermissionChangeReport {
    /// Folder roots newly created
    pub granted: usize,
    /// Folder roots removed
    pub revoked: usize,
    /// Per-item store failures (node id, error text); the batch is not
    /// transactional across items
    pub failures: Vec<(String, String)>,
    /// Whether a full resync was handed to the orchestrator
    pub resync_requested: bool,
}

impl PermissionChangeReport {
    /// Returns true if any change was applied
    pub fn changed(&self) -> bool {
        self.granted > 0 || self.revoked > 0
    }
}

/// Use case applying a batch of permission grants and revocations
pub struct ApplyPermissionChangesUseCase {
    store: Arc<dyn IMirrorStore>,
    orchestrator: OrchestratorHandle,
}

impl ApplyPermissionChangesUseCase {
    /// Creates the use case with its dependencies
    pub fn new(store: Arc<dyn IMirrorStore>, orchestrator: OrchestratorHandle) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Applies a batch of permission changes
    ///
    /// `changes` maps raw node ids to `"read"` or `"none"`. Any other
    /// value fails the whole batch with `InvalidPermission` before a
    /// single row is touched. Grants and revocations are idempotent;
    /// the resync handoff only happens when something actually changed,
    /// and its failure is logged, never raised.
    pub async fn execute(
        &self,
        connector_id: &ConnectorId,
        changes: &BTreeMap<String, String>,
    ) -> Result<PermissionChangeReport, ConnectorError> {
        self.store
            .get_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
            .ok_or(ConnectorError::ConnectorNotFound(*connector_id))?;

        // All-or-nothing validation pass
        let mut validated: Vec<(NodeId, PermissionValue)> = Vec::with_capacity(changes.len());
        for (raw_id, raw_value) in changes {
            let value = PermissionValue::parse(raw_id, raw_value)?;
            let node_id = NodeId::new(raw_id.clone())?;
            validated.push((node_id, value));
        }

        // Best-effort apply, per item
        let mut report = PermissionChangeReport::default();
        let mut newly_selected: Vec<NodeId> = Vec::new();

        for (node_id, value) in validated {
            let outcome = match value {
                PermissionValue::Read => {
                    let folder = MirroredFolder::new(*connector_id, node_id.clone());
                    self.store.upsert_folder(&folder).await.map(|created| {
                        if created {
                            report.granted += 1;
                            newly_selected.push(node_id.clone());
                        }
                    })
                }
                PermissionValue::None => {
                    self.store
                        .delete_folder(connector_id, &node_id)
                        .await
                        .map(|deleted| {
                            if deleted {
                                report.revoked += 1;
                            }
                        })
                }
            };

            if let Err(e) = outcome {
                warn!(
                    connector_id = %connector_id,
                    node_id = %node_id,
                    error = %format!("{e:#}"),
                    "Permission change failed for node"
                );
                report.failures.push((node_id.as_str().to_string(), e.to_string()));
            }
        }

        if report.changed() {
            match self.orchestrator.request_full_sync(*connector_id, None) {
                Ok(()) => {
                    report.resync_requested = true;
                    info!(
                        connector_id = %connector_id,
                        granted = report.granted,
                        revoked = report.revoked,
                        "Permission changes applied, full resync requested"
                    );
                    self.mark_pending(connector_id, &newly_selected).await;
                }
                Err(e) => {
                    // The grants stand either way; the next trigger catches up
                    warn!(
                        connector_id = %connector_id,
                        error = %e,
                        "Resync handoff rejected after permission change"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Moves freshly granted roots into SyncPending once the handoff landed
    async fn mark_pending(&self, connector_id: &ConnectorId, folders: &[NodeId]) {
        for folder_id in folders {
            if let Err(e) = self
                .store
                .set_folder_sync_state(connector_id, folder_id, FolderSyncState::SyncPending)
                .await
            {
                warn!(
                    connector_id = %connector_id,
                    folder_id = %folder_id,
                    error = %format!("{e:#}"),
                    "Failed to mark folder sync-pending"
                );
            }
        }
    }
}
