//! Reconciliation pass use case
//!
//! The sync work the external workflow engine invokes: walk every
//! selected root, paginate remote children breadth-first, and upsert
//! mirrored rows stamped with the pass timestamp. Each listing batch is
//! written in one transaction so concurrent readers never see a partial
//! subtree. A full pass followed by garbage collection (see
//! [`GarbageCollectUseCase`]) brings the mirror into agreement with
//! remote state.
//!
//! [`GarbageCollectUseCase`]: crate::usecases::garbage_collect::GarbageCollectUseCase

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{
    errors::ConnectorError,
    mirror::{FolderSyncState, MirroredFile},
    newtypes::{ConnectorId, NodeId},
    node::{NodeKind, RemoteNode},
};
use crate::ports::{IDirectoryProvider, IMirrorStore, ProviderError};

/// Whether a pass re-walks everything or only what changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Upsert every reachable node
    Full,
    /// Skip nodes not modified since the connector's last pass
    Incremental,
}

/// Statistics for one reconciliation pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Selected roots walked
    pub roots_walked: usize,
    /// Roots skipped because the provider no longer reports them
    pub roots_missing: usize,
    /// Mirrored rows written
    pub nodes_upserted: usize,
    /// Nodes skipped by the incremental filter
    pub nodes_skipped: usize,
}

/// Use case running a reconciliation pass over a connector's forest
pub struct ReconcileConnectorUseCase {
    provider: Arc<dyn IDirectoryProvider>,
    store: Arc<dyn IMirrorStore>,
}

impl ReconcileConnectorUseCase {
    /// Creates the use case with its port dependencies
    pub fn new(provider: Arc<dyn IDirectoryProvider>, store: Arc<dyn IMirrorStore>) -> Self {
        Self { provider, store }
    }

    /// Runs one pass
    ///
    /// Returns the pass statistics; the pass timestamp is recorded on
    /// the connector so a later garbage-collection cutoff and the
    /// incremental filter have a reference point.
    pub async fn execute(
        &self,
        connector_id: &ConnectorId,
        mode: SyncMode,
        cancel: &CancellationToken,
    ) -> Result<ReconcileStats, ConnectorError> {
        let mut connector = self
            .store
            .get_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
            .ok_or(ConnectorError::ConnectorNotFound(*connector_id))?;

        let pass_started = Utc::now();
        let changed_since = match mode {
            SyncMode::Full => None,
            SyncMode::Incremental => connector.last_synced_at(),
        };

        let roots = self
            .store
            .list_folders(connector_id)
            .await
            .map_err(ConnectorError::store)?;

        let mut stats = ReconcileStats::default();

        for root in &roots {
            let root_id = root.folder_id().clone();

            // A root the provider no longer reports is treated as revoked
            // remotely; it stays out of the pass and out of listings.
            let Some(root_node) = self
                .provider
                .get_node(&root_id)
                .await
                .map_err(upstream)?
            else {
                debug!(
                    connector_id = %connector_id,
                    folder_id = %root_id,
                    "Selected root missing remotely, skipping subtree"
                );
                stats.roots_missing += 1;
                continue;
            };

            self.walk_subtree(
                connector_id,
                root_node,
                changed_since,
                pass_started,
                cancel,
                &mut stats,
            )
            .await?;

            self.store
                .set_folder_sync_state(connector_id, &root_id, FolderSyncState::Synced)
                .await
                .map_err(ConnectorError::store)?;
            stats.roots_walked += 1;
        }

        connector.record_sync(pass_started);
        self.store
            .save_connector(&connector)
            .await
            .map_err(ConnectorError::store)?;

        info!(
            connector_id = %connector_id,
            roots = stats.roots_walked,
            upserted = stats.nodes_upserted,
            skipped = stats.nodes_skipped,
            "Reconciliation pass completed"
        );

        Ok(stats)
    }

    /// Breadth-first walk of one selected subtree
    async fn walk_subtree(
        &self,
        connector_id: &ConnectorId,
        root: RemoteNode,
        changed_since: Option<DateTime<Utc>>,
        pass_started: DateTime<Utc>,
        cancel: &CancellationToken,
        stats: &mut ReconcileStats,
    ) -> Result<(), ConnectorError> {
        // The root itself is mirrored too, so title lookups and parent
        // chains can resolve it without a remote call.
        if let Some(parent_id) = root.parent_id.clone() {
            let row = MirroredFile::new(
                *connector_id,
                root.id.clone(),
                parent_id,
                root.name.clone(),
                root.kind,
                pass_started,
            );
            self.store
                .upsert_file(&row)
                .await
                .map_err(ConnectorError::store)?;
            stats.nodes_upserted += 1;
        }

        let mut queue: VecDeque<NodeId> = VecDeque::from([root.id]);

        while let Some(parent) = queue.pop_front() {
            let mut page = None;

            loop {
                if cancel.is_cancelled() {
                    return Err(ConnectorError::Cancelled);
                }

                let response = self
                    .provider
                    .list_children(&parent, page.as_ref(), false)
                    .await
                    .map_err(upstream)?;

                let mut batch: Vec<MirroredFile> = Vec::with_capacity(response.nodes.len());
                for node in response.nodes {
                    if node.kind == NodeKind::Folder {
                        queue.push_back(node.id.clone());
                    }

                    if let (Some(cutoff), Some(modified_at)) = (changed_since, node.modified_at) {
                        if modified_at <= cutoff {
                            stats.nodes_skipped += 1;
                            continue;
                        }
                    }

                    batch.push(MirroredFile::new(
                        *connector_id,
                        node.id,
                        parent.clone(),
                        node.name,
                        node.kind,
                        pass_started,
                    ));
                }

                if !batch.is_empty() {
                    stats.nodes_upserted += batch.len();
                    self.store
                        .upsert_files(&batch)
                        .await
                        .map_err(ConnectorError::store)?;
                }

                match response.next_page {
                    Some(next) => page = Some(next),
                    None => break,
                }
            }
        }

        Ok(())
    }
}

/// Maps a provider failure to the caller-facing taxonomy
fn upstream(e: ProviderError) -> ConnectorError {
    ConnectorError::UpstreamUnavailable(e.to_string())
}
