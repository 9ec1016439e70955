//! Parent-chain resolution use case
//!
//! Walks mirror `parent_id` pointers from a node up to a root. The
//! memo cache is owned by the caller and scoped to one logical
//! operation: repeated walks within that operation reuse work, and the
//! cache dies with the operation instead of living process-wide.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{
    errors::ConnectorError,
    newtypes::{ConnectorId, NodeId},
};
use crate::ports::IMirrorStore;

/// Correlation-scoped memo for parent-chain walks
///
/// Create one per logical operation, pass it to every
/// [`ResolveParentChainUseCase::execute`] call within that operation,
/// and drop it at the end.
#[derive(Debug, Default)]
pub struct ChainCache {
    chains: HashMap<NodeId, Vec<NodeId>>,
}

impl ChainCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of memoized chains
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Returns true if nothing has been memoized yet
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Use case walking a node's ancestry in the mirror
pub struct ResolveParentChainUseCase {
    store: Arc<dyn IMirrorStore>,
}

impl ResolveParentChainUseCase {
    /// Creates the use case with its store dependency
    pub fn new(store: Arc<dyn IMirrorStore>) -> Self {
        Self { store }
    }

    /// Resolves the chain from `node_id` to its root, node first
    ///
    /// The walk ends at the first id with no mirrored row (selected
    /// roots have no parent row of their own). Intermediate results are
    /// memoized in `cache`, so resolving a sibling afterwards reuses
    /// the shared suffix.
    ///
    /// # Errors
    ///
    /// `CycleDetected` if the chain revisits a node. The mirror's
    /// invariants should make this impossible; the guard bounds the
    /// damage of a corrupted parent pointer.
    pub async fn execute(
        &self,
        connector_id: &ConnectorId,
        node_id: &NodeId,
        cache: &mut ChainCache,
    ) -> Result<Vec<NodeId>, ConnectorError> {
        if let Some(chain) = cache.chains.get(node_id) {
            return Ok(chain.clone());
        }

        let mut chain: Vec<NodeId> = Vec::new();
        let mut visited: Vec<NodeId> = Vec::new();
        let mut current = node_id.clone();

        loop {
            if visited.contains(&current) {
                return Err(ConnectorError::CycleDetected(current));
            }
            visited.push(current.clone());

            // A previously resolved suffix finishes the walk for free
            if let Some(suffix) = cache.chains.get(&current) {
                chain.extend(suffix.iter().cloned());
                break;
            }

            chain.push(current.clone());

            let file = self
                .store
                .find_file(connector_id, &current)
                .await
                .map_err(ConnectorError::store)?;

            match file {
                Some(file) => current = file.parent_id().clone(),
                // Reached a node with no mirrored row: the chain root
                None => break,
            }
        }

        // Memoize every suffix so later walks share the work
        for (i, id) in chain.iter().enumerate() {
            cache
                .chains
                .entry(id.clone())
                .or_insert_with(|| chain[i..].to_vec());
        }

        Ok(chain)
    }
}
