//! Remote directory provider port (driven/secondary port)
//!
//! Interface for the third-party content provider's directory API.
//! The primary implementation targets Google Drive, but the trait is
//! provider-agnostic.
//!
//! ## Design Notes
//!
//! - Unlike the store port, this port uses a typed [`ProviderError`]:
//!   use cases must distinguish rate limiting and not-found from
//!   generic upstream failure, and retries belong to the caller.
//! - Listing returns one page at a time; merge loops live in the use
//!   cases so they can suspend between pages and honor cancellation.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::newtypes::{ChannelId, ConnectorId, NodeId, PageCursor};
use crate::domain::node::RemoteNode;

/// Errors from the remote directory API
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 429-equivalent throttle response; the caller owns backoff
    #[error("Provider rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited {
        /// Provider-suggested backoff, when the response carried one
        retry_after_secs: Option<u64>,
    },

    /// Any other remote failure (network, 5xx, malformed response)
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// One page of a remote listing
#[derive(Debug, Clone)]
pub struct NodePage {
    /// Normalized node descriptors in provider order
    pub nodes: Vec<RemoteNode>,
    /// Cursor for the next page (None on the last page)
    pub next_page: Option<PageCursor>,
}

impl NodePage {
    /// An empty terminal page
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            next_page: None,
        }
    }
}

/// Result of creating a push-notification channel at the provider
#[derive(Debug, Clone)]
pub struct ChannelGrant {
    /// Provider-assigned channel identifier
    pub channel_id: ChannelId,
    /// Provider resource handle needed to stop the channel later
    pub resource_id: String,
    /// Provider-supplied expiry
    pub expires_at: DateTime<Utc>,
}

/// Port trait for remote directory operations
///
/// Assumed idempotent and strongly consistent within seconds. The
/// implementation maps the provider's throttle responses to
/// [`ProviderError::RateLimited`] and performs no retries of its own.
#[async_trait::async_trait]
pub trait IDirectoryProvider: Send + Sync {
    /// Lists one page of children of `parent`
    ///
    /// # Arguments
    /// * `parent` - The container node to list
    /// * `page` - Cursor from a previous page (None for the first page)
    /// * `folders_only` - Restrict the listing to folder nodes
    async fn list_children(
        &self,
        parent: &NodeId,
        page: Option<&PageCursor>,
        folders_only: bool,
    ) -> Result<NodePage, ProviderError>;

    /// Lists one page of top-level containers (shared drives)
    async fn list_drives(&self, page: Option<&PageCursor>) -> Result<NodePage, ProviderError>;

    /// Fetches a single node by id
    ///
    /// Returns `Ok(None)` when the provider reports the node gone
    /// (deleted or access revoked).
    async fn get_node(&self, id: &NodeId) -> Result<Option<RemoteNode>, ProviderError>;

    /// Creates a push-notification channel delivering to `callback_url`
    async fn create_channel(
        &self,
        connector_id: &ConnectorId,
        callback_url: &str,
    ) -> Result<ChannelGrant, ProviderError>;

    /// Stops a previously created channel
    async fn stop_channel(
        &self,
        channel_id: &ChannelId,
        resource_id: &str,
    ) -> Result<(), ProviderError>;
}
