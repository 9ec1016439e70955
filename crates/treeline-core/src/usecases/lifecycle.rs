//! Connector lifecycle interface and provider registry
//!
//! One polymorphic interface per provider variant replaces scattered
//! per-call-site dispatch: the registry resolves a provider's lifecycle
//! once at registration, and every caller goes through the trait.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    connector::{Connector, ProviderKind},
    errors::ConnectorError,
    newtypes::ConnectorId,
};
use crate::orchestrator::OrchestratorHandle;
use crate::ports::{IDirectoryProvider, IMirrorStore};
use crate::usecases::register_channel::RegisterChannelUseCase;

/// Lifecycle operations every provider variant implements
#[async_trait::async_trait]
pub trait ConnectorLifecycle: Send + Sync {
    /// Sets up a new connector: persistence, webhook channel, first sync
    async fn create(&self, connector: &Connector) -> Result<(), ConnectorError>;

    /// Administratively pauses the connector
    async fn stop(&self, connector_id: &ConnectorId) -> Result<(), ConnectorError>;

    /// Resumes a paused connector and catches up
    async fn resume(&self, connector_id: &ConnectorId) -> Result<(), ConnectorError>;

    /// Triggers a full sync of the connector
    async fn sync(&self, connector_id: &ConnectorId) -> Result<(), ConnectorError>;

    /// Tears the connector down: channel stopped, every owned row gone
    async fn cleanup(&self, connector_id: &ConnectorId) -> Result<(), ConnectorError>;
}

/// Maps provider kinds to their lifecycle implementations
///
/// Populated once at startup; lookups are cheap clones of the shared
/// trait object.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ConnectorLifecycle>>,
}

impl ProviderRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider's lifecycle, replacing any previous entry
    pub fn register(&mut self, kind: ProviderKind, lifecycle: Arc<dyn ConnectorLifecycle>) {
        self.providers.insert(kind, lifecycle);
    }

    /// Resolves the lifecycle for a provider kind
    pub fn resolve(&self, kind: ProviderKind) -> Option<Arc<dyn ConnectorLifecycle>> {
        self.providers.get(&kind).cloned()
    }
}

/// Google Drive lifecycle composed from the ports
pub struct DriveConnectorLifecycle {
    store: Arc<dyn IMirrorStore>,
    provider: Arc<dyn IDirectoryProvider>,
    orchestrator: OrchestratorHandle,
    register_channel: RegisterChannelUseCase,
}

impl DriveConnectorLifecycle {
    /// Creates the lifecycle with its dependencies
    pub fn new(
        store: Arc<dyn IMirrorStore>,
        provider: Arc<dyn IDirectoryProvider>,
        orchestrator: OrchestratorHandle,
        callback_url: impl Into<String>,
    ) -> Self {
        let register_channel = RegisterChannelUseCase::new(
            Arc::clone(&provider),
            Arc::clone(&store),
            callback_url,
        );
        Self {
            store,
            provider,
            orchestrator,
            register_channel,
        }
    }

    async fn load(&self, connector_id: &ConnectorId) -> Result<Connector, ConnectorError> {
        self.store
            .get_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
            .ok_or(ConnectorError::ConnectorNotFound(*connector_id))
    }
}

#[async_trait::async_trait]
impl ConnectorLifecycle for DriveConnectorLifecycle {
    async fn create(&self, connector: &Connector) -> Result<(), ConnectorError> {
        self.store
            .save_connector(connector)
            .await
            .map_err(ConnectorError::store)?;

        self.register_channel.execute(connector.id()).await?;

        // Fire-and-forget: the connector is created either way
        if let Err(e) = self.orchestrator.request_full_sync(*connector.id(), None) {
            warn!(
                connector_id = %connector.id(),
                error = %e,
                "Initial sync handoff rejected at connector creation"
            );
        }

        info!(connector_id = %connector.id(), "Connector created");
        Ok(())
    }

    async fn stop(&self, connector_id: &ConnectorId) -> Result<(), ConnectorError> {
        let mut connector = self.load(connector_id).await?;
        connector.pause()?;
        self.store
            .save_connector(&connector)
            .await
            .map_err(ConnectorError::store)?;
        info!(connector_id = %connector_id, "Connector paused");
        Ok(())
    }

    async fn resume(&self, connector_id: &ConnectorId) -> Result<(), ConnectorError> {
        let mut connector = self.load(connector_id).await?;
        connector.resume()?;
        self.store
            .save_connector(&connector)
            .await
            .map_err(ConnectorError::store)?;

        if let Err(e) = self.orchestrator.request_incremental_sync(*connector_id) {
            warn!(
                connector_id = %connector_id,
                error = %e,
                "Catch-up sync handoff rejected at connector resume"
            );
        }

        info!(connector_id = %connector_id, "Connector resumed");
        Ok(())
    }

    async fn sync(&self, connector_id: &ConnectorId) -> Result<(), ConnectorError> {
        self.load(connector_id).await?;
        self.orchestrator
            .request_full_sync(*connector_id, None)
            .map_err(|e| ConnectorError::RateLimited(e.to_string()))
    }

    async fn cleanup(&self, connector_id: &ConnectorId) -> Result<(), ConnectorError> {
        self.load(connector_id).await?;

        // Stop the provider-side channel first; a failure here must not
        // leave the local rows behind.
        if let Some(channel) = self
            .store
            .find_channel_for_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
        {
            if let Err(e) = self
                .provider
                .stop_channel(channel.channel_id(), channel.resource_id())
                .await
            {
                warn!(
                    connector_id = %connector_id,
                    channel_id = %channel.channel_id(),
                    error = %e,
                    "Failed to stop channel during cleanup"
                );
            }
        }

        self.store
            .delete_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?;

        info!(connector_id = %connector_id, "Connector cleaned up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MirroredFolder, ConnectorState};
    use crate::orchestrator::SyncCommand;
    use crate::ports::WorkflowKind;
    use crate::test_support::{node_id, FakeDirectoryProvider, InMemoryMirrorStore};
    use tokio::sync::mpsc;

    struct Fixture {
        store: Arc<InMemoryMirrorStore>,
        lifecycle: DriveConnectorLifecycle,
        rx: mpsc::Receiver<SyncCommand>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryMirrorStore::new());
        let provider = Arc::new(FakeDirectoryProvider::new(10));
        let (handle, rx) = OrchestratorHandle::pair(8);
        let lifecycle = DriveConnectorLifecycle::new(
            Arc::clone(&store) as Arc<dyn IMirrorStore>,
            provider as Arc<dyn IDirectoryProvider>,
            handle,
            "https://connectors.example.com/notifications",
        );
        Fixture {
            store,
            lifecycle,
            rx,
        }
    }

    #[tokio::test]
    async fn test_create_registers_channel_and_triggers_sync() {
        let mut f = fixture();
        let connector = Connector::new(ProviderKind::GoogleDrive);

        f.lifecycle.create(&connector).await.unwrap();

        assert!(f
            .store
            .get_connector(connector.id())
            .await
            .unwrap()
            .is_some());
        assert!(f
            .store
            .find_channel_for_connector(connector.id())
            .await
            .unwrap()
            .is_some());
        let command = f.rx.try_recv().unwrap();
        assert_eq!(command.kind, WorkflowKind::FullSync { cursor: None });
    }

    #[tokio::test]
    async fn test_stop_and_resume() {
        let mut f = fixture();
        let connector = Connector::new(ProviderKind::GoogleDrive);
        f.lifecycle.create(&connector).await.unwrap();
        f.rx.try_recv().unwrap();

        f.lifecycle.stop(connector.id()).await.unwrap();
        let stored = f
            .store
            .get_connector(connector.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state(), ConnectorState::Paused);

        f.lifecycle.resume(connector.id()).await.unwrap();
        let stored = f
            .store
            .get_connector(connector.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state(), ConnectorState::Active);
        assert_eq!(f.rx.try_recv().unwrap().kind, WorkflowKind::IncrementalSync);
    }

    #[tokio::test]
    async fn test_cleanup_removes_everything() {
        let mut f = fixture();
        let connector = Connector::new(ProviderKind::GoogleDrive);
        f.lifecycle.create(&connector).await.unwrap();
        f.rx.try_recv().unwrap();

        let folder = MirroredFolder::new(*connector.id(), node_id("F1"));
        f.store.upsert_folder(&folder).await.unwrap();

        f.lifecycle.cleanup(connector.id()).await.unwrap();

        assert!(f
            .store
            .get_connector(connector.id())
            .await
            .unwrap()
            .is_none());
        assert!(f
            .store
            .find_channel_for_connector(connector.id())
            .await
            .unwrap()
            .is_none());
        assert!(f.store.folder_ids(connector.id()).is_empty());
    }

    #[tokio::test]
    async fn test_registry_resolves_registered_provider() {
        let f = fixture();
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderKind::GoogleDrive, Arc::new(f.lifecycle));

        assert!(registry.resolve(ProviderKind::GoogleDrive).is_some());
    }

    #[tokio::test]
    async fn test_stop_unknown_connector_fails() {
        let f = fixture();
        let err = f.lifecycle.stop(&ConnectorId::new()).await.unwrap_err();
        assert!(matches!(err, ConnectorError::ConnectorNotFound(_)));
    }
}
