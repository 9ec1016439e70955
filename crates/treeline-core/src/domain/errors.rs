//! Domain and operation error types
//!
//! `DomainError` covers construction-time validation failures and invalid
//! state transitions. `ConnectorError` is the taxonomy surfaced by the
//! reconciler and webhook operations.

use thiserror::Error;

use super::newtypes::{ConnectorId, NodeId};

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid node identifier format
    #[error("Invalid node ID: {0}")]
    InvalidNodeId(String),

    /// Invalid channel identifier format
    #[error("Invalid channel ID: {0}")]
    InvalidChannelId(String),

    /// Invalid pagination cursor
    #[error("Invalid page cursor: {0}")]
    InvalidPageCursor(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

/// Errors surfaced by reconciler and webhook operations
///
/// Validation variants fail fast before any mutation; remote failures
/// propagate unmodified (retry policy belongs to the caller);
/// `RateLimited` is a soft condition that callers acknowledge rather
/// than fail on.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connector id does not resolve to a configured connector
    #[error("Connector not found: {0}")]
    ConnectorNotFound(ConnectorId),

    /// The remote API call failed; surfaced to the caller, never retried here
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A permission change carried a value other than "read" or "none"
    #[error("Invalid permission {value:?} for node {node_id}")]
    InvalidPermission {
        /// The node the change targeted
        node_id: String,
        /// The rejected permission value
        value: String,
    },

    /// Push-notification channel creation failed at the provider
    #[error("Webhook registration failed: {0}")]
    RegistrationFailed(String),

    /// Neither the channel id nor the routing connector id resolved
    #[error("Unresolved webhook channel: {0}")]
    UnresolvedChannel(String),

    /// The trigger was rejected due to rate limiting; acknowledged, not failed
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A parent-chain walk revisited a node
    #[error("Cycle detected at node {0}")]
    CycleDetected(NodeId),

    /// The caller abandoned the operation mid-pagination
    #[error("Operation cancelled")]
    Cancelled,

    /// A domain invariant was violated
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The local mirror store failed
    #[error("Mirror store failure: {0}")]
    Store(#[source] anyhow::Error),
}

impl ConnectorError {
    /// Wraps a mirror store failure
    pub fn store(e: anyhow::Error) -> Self {
        Self::Store(e)
    }
}
