//! IDirectoryProvider implementation backed by the Drive API

use treeline_core::domain::newtypes::{ChannelId, ConnectorId, NodeId, PageCursor};
use treeline_core::domain::node::RemoteNode;
use treeline_core::ports::{ChannelGrant, IDirectoryProvider, NodePage, ProviderError};

use crate::client::DriveClient;
use crate::{files, watch};

/// Google Drive adapter for the directory provider port
pub struct DriveDirectoryProvider {
    client: DriveClient,
}

impl DriveDirectoryProvider {
    /// Creates the adapter around a configured client
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IDirectoryProvider for DriveDirectoryProvider {
    async fn list_children(
        &self,
        parent: &NodeId,
        page: Option<&PageCursor>,
        folders_only: bool,
    ) -> Result<NodePage, ProviderError> {
        files::list_children(&self.client, parent, page, folders_only).await
    }

    async fn list_drives(&self, page: Option<&PageCursor>) -> Result<NodePage, ProviderError> {
        files::list_drives(&self.client, page).await
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<RemoteNode>, ProviderError> {
        files::get_node(&self.client, id).await
    }

    async fn create_channel(
        &self,
        connector_id: &ConnectorId,
        callback_url: &str,
    ) -> Result<ChannelGrant, ProviderError> {
        watch::create_channel(&self.client, connector_id, callback_url).await
    }

    async fn stop_channel(
        &self,
        channel_id: &ChannelId,
        resource_id: &str,
    ) -> Result<(), ProviderError> {
        watch::stop_channel(&self.client, channel_id, resource_id).await
    }
}
