//! Visible-node listing use case
//!
//! Produces the externally visible permission tree. Two modes:
//! `read-only` answers from the local mirror (roots are enriched with
//! live remote metadata), `discover` browses the remote tree so the
//! user can pick new selections. Results are deterministically sorted
//! regardless of remote ordering so the UI stays stable across calls.

use std::str::FromStr;
use std::sync::Arc;

use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{
    errors::{ConnectorError, DomainError},
    newtypes::{ConnectorId, NodeId},
    node::{sort_visible, NodeKind, Permission, RemoteNode, VisibleNode},
};
use crate::ports::{IDirectoryProvider, IMirrorStore, ProviderError};

/// Concurrency limit for per-node enrichment lookups
///
/// Keeps listing from flooding the store (or the remote API) with many
/// cheap parallel calls.
const ENRICH_CONCURRENCY: usize = 4;

/// Which view of the tree the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListFilter {
    /// Nodes already granted; answered from the mirror
    #[serde(rename = "read-only")]
    ReadOnly,
    /// Remote browsing to pick new selections
    #[serde(rename = "discover")]
    Discover,
}

impl FromStr for ListFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read-only" => Ok(ListFilter::ReadOnly),
            "discover" => Ok(ListFilter::Discover),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown list filter: {other}"
            ))),
        }
    }
}

/// Use case producing annotated listings of the permission tree
pub struct ListNodesUseCase {
    provider: Arc<dyn IDirectoryProvider>,
    store: Arc<dyn IMirrorStore>,
}

impl ListNodesUseCase {
    /// Creates the use case with its port dependencies
    pub fn new(provider: Arc<dyn IDirectoryProvider>, store: Arc<dyn IMirrorStore>) -> Self {
        Self { provider, store }
    }

    /// Lists the visible nodes under `parent` (top level when `None`)
    ///
    /// The cancellation token bounds discover-mode pagination; it is
    /// checked between pages, never mid-request.
    ///
    /// # Errors
    ///
    /// `ConnectorNotFound` if the connector id does not resolve;
    /// `UpstreamUnavailable` if a remote call fails (propagated, not
    /// retried here); `Cancelled` if the caller abandoned the listing.
    pub async fn execute(
        &self,
        connector_id: &ConnectorId,
        parent: Option<&NodeId>,
        filter: ListFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<VisibleNode>, ConnectorError> {
        self.store
            .get_connector(connector_id)
            .await
            .map_err(ConnectorError::store)?
            .ok_or(ConnectorError::ConnectorNotFound(*connector_id))?;

        let mut nodes = match (filter, parent) {
            (ListFilter::ReadOnly, None) => self.selected_roots(connector_id).await?,
            (ListFilter::ReadOnly, Some(parent)) => {
                self.mirrored_children(connector_id, parent).await?
            }
            (ListFilter::Discover, None) => self.remote_drives(connector_id, cancel).await?,
            (ListFilter::Discover, Some(parent)) => {
                self.remote_folders(connector_id, parent, cancel).await?
            }
        };

        sort_visible(&mut nodes);
        Ok(nodes)
    }

    /// Top-level selected roots, enriched with live remote metadata
    ///
    /// Roots the provider no longer reports are treated as revoked and
    /// silently excluded rather than surfaced as errors.
    async fn selected_roots(
        &self,
        connector_id: &ConnectorId,
    ) -> Result<Vec<VisibleNode>, ConnectorError> {
        let folders = self
            .store
            .list_folders(connector_id)
            .await
            .map_err(ConnectorError::store)?;

        let enriched: Vec<Result<Option<VisibleNode>, ConnectorError>> =
            stream::iter(folders.into_iter().map(|folder| {
                let provider = Arc::clone(&self.provider);
                let store = Arc::clone(&self.store);
                let connector_id = *connector_id;
                async move {
                    let folder_id = folder.folder_id().clone();
                    let remote = provider.get_node(&folder_id).await.map_err(upstream)?;

                    let Some(remote) = remote else {
                        debug!(
                            connector_id = %connector_id,
                            folder_id = %folder_id,
                            "Selected root missing remotely, excluding from listing"
                        );
                        return Ok(None);
                    };

                    let expandable = store
                        .has_children(&connector_id, &folder_id)
                        .await
                        .map_err(ConnectorError::store)?;

                    Ok(Some(VisibleNode::from_remote(
                        remote,
                        Permission::Read,
                        expandable,
                    )))
                }
            }))
            .buffer_unordered(ENRICH_CONCURRENCY)
            .collect()
            .await;

        let mut nodes = Vec::new();
        for result in enriched {
            if let Some(node) = result? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Children of a granted node, answered entirely from the mirror
    async fn mirrored_children(
        &self,
        connector_id: &ConnectorId,
        parent: &NodeId,
    ) -> Result<Vec<VisibleNode>, ConnectorError> {
        let children = self
            .store
            .find_children(connector_id, parent)
            .await
            .map_err(ConnectorError::store)?;

        let annotated: Vec<Result<VisibleNode, ConnectorError>> =
            stream::iter(children.into_iter().map(|child| {
                let store = Arc::clone(&self.store);
                let connector_id = *connector_id;
                async move {
                    let expandable = match child.kind() {
                        NodeKind::Folder => store
                            .has_children(&connector_id, child.file_id())
                            .await
                            .map_err(ConnectorError::store)?,
                        NodeKind::File => false,
                    };

                    Ok(VisibleNode {
                        id: child.file_id().clone(),
                        parent_id: Some(child.parent_id().clone()),
                        title: child.name().to_string(),
                        kind: child.kind(),
                        permission: Permission::Read,
                        expandable,
                        updated_at: Some(child.last_upserted_at()),
                        web_url: None,
                    })
                }
            }))
            .buffer_unordered(ENRICH_CONCURRENCY)
            .collect()
            .await;

        annotated.into_iter().collect()
    }

    /// Top-level remote containers annotated with granted permission
    async fn remote_drives(
        &self,
        connector_id: &ConnectorId,
        cancel: &CancellationToken,
    ) -> Result<Vec<VisibleNode>, ConnectorError> {
        let mut drives = Vec::new();
        let mut page = None;

        loop {
            if cancel.is_cancelled() {
                return Err(ConnectorError::Cancelled);
            }

            let response = self
                .provider
                .list_drives(page.as_ref())
                .await
                .map_err(upstream)?;
            drives.extend(response.nodes);

            match response.next_page {
                Some(next) => page = Some(next),
                None => break,
            }
        }

        self.annotate_discovered(connector_id, drives).await
    }

    /// Remote child folders of a node, merged across pages
    ///
    /// Only folders are browsed in discover mode; files become visible
    /// once a subtree is granted and synced.
    async fn remote_folders(
        &self,
        connector_id: &ConnectorId,
        parent: &NodeId,
        cancel: &CancellationToken,
    ) -> Result<Vec<VisibleNode>, ConnectorError> {
        let mut folders = Vec::new();
        let mut page = None;

        loop {
            if cancel.is_cancelled() {
                return Err(ConnectorError::Cancelled);
            }

            let response = self
                .provider
                .list_children(parent, page.as_ref(), true)
                .await
                .map_err(upstream)?;
            folders.extend(response.nodes);

            match response.next_page {
                Some(next) => page = Some(next),
                None => break,
            }
        }

        self.annotate_discovered(connector_id, folders).await
    }

    /// Annotates discovered nodes with the granted/none permission flag
    async fn annotate_discovered(
        &self,
        connector_id: &ConnectorId,
        nodes: Vec<RemoteNode>,
    ) -> Result<Vec<VisibleNode>, ConnectorError> {
        let annotated: Vec<Result<VisibleNode, ConnectorError>> =
            stream::iter(nodes.into_iter().map(|node| {
                let store = Arc::clone(&self.store);
                let connector_id = *connector_id;
                async move {
                    let granted = store
                        .folder_exists(&connector_id, &node.id)
                        .await
                        .map_err(ConnectorError::store)?;

                    let permission = if granted {
                        Permission::Read
                    } else {
                        Permission::None
                    };
                    let expandable = node.kind == NodeKind::Folder;

                    Ok(VisibleNode::from_remote(node, permission, expandable))
                }
            }))
            .buffer_unordered(ENRICH_CONCURRENCY)
            .collect()
            .await;

        annotated.into_iter().collect()
    }
}

/// Maps a provider failure to the caller-facing taxonomy
///
/// Rate limiting is folded into `UpstreamUnavailable`: the orchestrator
/// owns backoff, this layer only reports that the upstream refused us.
fn upstream(e: ProviderError) -> ConnectorError {
    ConnectorError::UpstreamUnavailable(e.to_string())
}
