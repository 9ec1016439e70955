//! Inbound webhook notification use case
//!
//! Translates a provider notification into an incremental sync trigger.
//! The transport layer acknowledges the provider regardless of what
//! happens here (except for malformed requests); this use case reports
//! an outcome so the caller can log it, and only fails for conditions
//! the transport maps to an acknowledgment anyway.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    errors::ConnectorError,
    mirror::FolderSyncState,
    newtypes::{ChannelId, ConnectorId},
};
use crate::orchestrator::OrchestratorHandle;
use crate::ports::IMirrorStore;

/// What a notification ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// An incremental sync was handed to the orchestrator
    SyncTriggered,
    /// The connector is paused; acknowledged and dropped by design
    DroppedPaused,
    /// The inbox was saturated; acknowledged, condition logged
    DroppedRateLimited,
}

/// Use case resolving notifications to sync triggers
pub struct HandleNotificationUseCase {
    store: Arc<dyn IMirrorStore>,
    orchestrator: OrchestratorHandle,
}

impl HandleNotificationUseCase {
    /// Creates the use case with its dependencies
    pub fn new(store: Arc<dyn IMirrorStore>, orchestrator: OrchestratorHandle) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Handles one notification
    ///
    /// The channel id is looked up first; when unknown (e.g. a channel
    /// recreated elsewhere), the connector id carried in the routing
    /// path is the compatibility fallback.
    ///
    /// # Errors
    ///
    /// `UnresolvedChannel` when neither the channel id nor the route
    /// parameter resolves to a connector.
    pub async fn execute(
        &self,
        channel_id: &ChannelId,
        route_connector_id: Option<&ConnectorId>,
    ) -> Result<NotificationOutcome, ConnectorError> {
        let connector_id = self
            .resolve_connector(channel_id, route_connector_id)
            .await?;

        let connector = self
            .store
            .get_connector(&connector_id)
            .await
            .map_err(ConnectorError::store)?
            .ok_or_else(|| ConnectorError::UnresolvedChannel(channel_id.to_string()))?;

        if !connector.state().can_sync() {
            // Intentional backpressure: the provider gets its ack, the
            // paused connector gets no work.
            info!(
                connector_id = %connector_id,
                channel_id = %channel_id,
                "Notification for paused connector dropped"
            );
            return Ok(NotificationOutcome::DroppedPaused);
        }

        match self.orchestrator.request_incremental_sync(connector_id) {
            Ok(()) => {
                debug!(
                    connector_id = %connector_id,
                    channel_id = %channel_id,
                    "Incremental sync triggered by notification"
                );
                self.mark_roots_pending(&connector_id).await;
                Ok(NotificationOutcome::SyncTriggered)
            }
            Err(e) => {
                // The provider must not see this as a failure
                warn!(
                    connector_id = %connector_id,
                    channel_id = %channel_id,
                    error = %e,
                    "Notification dropped, sync inbox saturated"
                );
                Ok(NotificationOutcome::DroppedRateLimited)
            }
        }
    }

    /// Resolves the notification to a connector id
    async fn resolve_connector(
        &self,
        channel_id: &ChannelId,
        route_connector_id: Option<&ConnectorId>,
    ) -> Result<ConnectorId, ConnectorError> {
        if let Some(channel) = self
            .store
            .find_channel(channel_id)
            .await
            .map_err(ConnectorError::store)?
        {
            return Ok(*channel.connector_id());
        }

        // Defensive compatibility path: trust the connector id embedded
        // in the notification's routing path when the channel is unknown.
        if let Some(route_id) = route_connector_id {
            if self
                .store
                .get_connector(route_id)
                .await
                .map_err(ConnectorError::store)?
                .is_some()
            {
                debug!(
                    connector_id = %route_id,
                    channel_id = %channel_id,
                    "Unknown channel resolved via route connector id"
                );
                return Ok(*route_id);
            }
        }

        Err(ConnectorError::UnresolvedChannel(channel_id.to_string()))
    }

    /// Re-enters SyncPending on every synced root touched by the change
    async fn mark_roots_pending(&self, connector_id: &ConnectorId) {
        let folders = match self.store.list_folders(connector_id).await {
            Ok(folders) => folders,
            Err(e) => {
                warn!(
                    connector_id = %connector_id,
                    error = %format!("{e:#}"),
                    "Failed to list folders after notification"
                );
                return;
            }
        };

        for folder in folders {
            if folder.sync_state() != FolderSyncState::Synced {
                continue;
            }
            if let Err(e) = self
                .store
                .set_folder_sync_state(
                    connector_id,
                    folder.folder_id(),
                    FolderSyncState::SyncPending,
                )
                .await
            {
                warn!(
                    connector_id = %connector_id,
                    folder_id = %folder.folder_id(),
                    error = %format!("{e:#}"),
                    "Failed to mark folder sync-pending"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connector, MirroredFolder, ProviderKind, WebhookChannel};
    use crate::orchestrator::SyncCommand;
    use crate::ports::WorkflowKind;
    use crate::test_support::{node_id, InMemoryMirrorStore};
    use chrono::Utc;
    use tokio::sync::mpsc;

    struct Fixture {
        store: Arc<InMemoryMirrorStore>,
        usecase: HandleNotificationUseCase,
        connector_id: ConnectorId,
        rx: mpsc::Receiver<SyncCommand>,
    }

    async fn fixture(paused: bool, capacity: usize) -> Fixture {
        let store = Arc::new(InMemoryMirrorStore::new());
        let mut connector = Connector::new(ProviderKind::GoogleDrive);
        if paused {
            connector.pause().unwrap();
        }
        let connector_id = *connector.id();
        store.save_connector(&connector).await.unwrap();
        let (handle, rx) = OrchestratorHandle::pair(capacity);
        let usecase =
            HandleNotificationUseCase::new(Arc::clone(&store) as Arc<dyn IMirrorStore>, handle);
        Fixture {
            store,
            usecase,
            connector_id,
            rx,
        }
    }

    fn channel_id(s: &str) -> ChannelId {
        ChannelId::new(s.to_string()).unwrap()
    }

    async fn track_channel(f: &Fixture, id: &str) {
        let channel = WebhookChannel::new(
            f.connector_id,
            channel_id(id),
            "res-1",
            Utc::now() + chrono::Duration::days(7),
        );
        f.store.save_channel(&channel).await.unwrap();
    }

    #[tokio::test]
    async fn test_known_channel_triggers_incremental_sync() {
        let mut f = fixture(false, 8).await;
        track_channel(&f, "chan-1").await;

        let outcome = f
            .usecase
            .execute(&channel_id("chan-1"), None)
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::SyncTriggered);
        let command = f.rx.try_recv().unwrap();
        assert_eq!(command.connector_id, f.connector_id);
        assert_eq!(command.kind, WorkflowKind::IncrementalSync);
    }

    #[tokio::test]
    async fn test_unknown_channel_falls_back_to_route_connector() {
        let mut f = fixture(false, 8).await;

        let outcome = f
            .usecase
            .execute(&channel_id("stale-chan"), Some(&f.connector_id))
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::SyncTriggered);
        assert_eq!(f.rx.try_recv().unwrap().connector_id, f.connector_id);
    }

    #[tokio::test]
    async fn test_nothing_resolves_is_unresolved_channel() {
        let f = fixture(false, 8).await;

        let err = f
            .usecase
            .execute(&channel_id("stale-chan"), Some(&ConnectorId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::UnresolvedChannel(_)));
    }

    #[tokio::test]
    async fn test_paused_connector_drops_notification() {
        let mut f = fixture(true, 8).await;
        track_channel(&f, "chan-1").await;

        let outcome = f
            .usecase
            .execute(&channel_id("chan-1"), None)
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::DroppedPaused);
        // Zero calls reach the orchestrator
        assert!(f.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_saturated_inbox_is_acknowledged() {
        let mut f = fixture(false, 1).await;
        track_channel(&f, "chan-1").await;

        // First notification fills the inbox
        f.usecase
            .execute(&channel_id("chan-1"), None)
            .await
            .unwrap();
        let outcome = f
            .usecase
            .execute(&channel_id("chan-1"), None)
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::DroppedRateLimited);
        // Only the first trigger made it through
        f.rx.try_recv().unwrap();
        assert!(f.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_synced_roots_reenter_sync_pending() {
        let mut f = fixture(false, 8).await;
        track_channel(&f, "chan-1").await;

        let folder = MirroredFolder::new(f.connector_id, node_id("F1"));
        f.store.upsert_folder(&folder).await.unwrap();
        f.store
            .set_folder_sync_state(&f.connector_id, &node_id("F1"), FolderSyncState::Synced)
            .await
            .unwrap();

        f.usecase
            .execute(&channel_id("chan-1"), None)
            .await
            .unwrap();
        f.rx.try_recv().unwrap();

        let folders = f.store.list_folders(&f.connector_id).await.unwrap();
        assert_eq!(folders[0].sync_state(), FolderSyncState::SyncPending);
    }
}
