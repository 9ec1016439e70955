//! Batch title resolution use case
//!
//! Answers entirely from the local mirror; unknown ids are simply
//! absent from the result map, never an error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{
    errors::ConnectorError,
    newtypes::{ConnectorId, NodeId},
};
use crate::ports::IMirrorStore;

/// Use case resolving cached titles for a set of node ids
pub struct ResolveTitlesUseCase {
    store: Arc<dyn IMirrorStore>,
}

impl ResolveTitlesUseCase {
    /// Creates the use case with its store dependency
    pub fn new(store: Arc<dyn IMirrorStore>) -> Self {
        Self { store }
    }

    /// Resolves the cached title for each known id
    ///
    /// No remote call is ever made; an empty or all-unknown input
    /// yields an empty map.
    pub async fn execute(
        &self,
        connector_id: &ConnectorId,
        ids: &[NodeId],
    ) -> Result<HashMap<NodeId, String>, ConnectorError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let files = self
            .store
            .find_files_by_ids(connector_id, ids)
            .await
            .map_err(ConnectorError::store)?;

        Ok(files
            .into_iter()
            .map(|(id, file)| (id, file.name().to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MirroredFile, NodeKind};
    use crate::test_support::{node_id, InMemoryMirrorStore};
    use chrono::Utc;

    async fn store_with_file(connector_id: ConnectorId, id: &str, name: &str) -> Arc<InMemoryMirrorStore> {
        let store = Arc::new(InMemoryMirrorStore::new());
        let file = MirroredFile::new(
            connector_id,
            node_id(id),
            node_id("root"),
            name,
            NodeKind::File,
            Utc::now(),
        );
        store.upsert_file(&file).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_known_ids_resolve() {
        let connector_id = ConnectorId::new();
        let store = store_with_file(connector_id, "A1", "budget.xlsx").await;
        let usecase = ResolveTitlesUseCase::new(store);

        let titles = usecase
            .execute(&connector_id, &[node_id("A1"), node_id("missing")])
            .await
            .unwrap();

        assert_eq!(titles.len(), 1);
        assert_eq!(titles.get(&node_id("A1")).unwrap(), "budget.xlsx");
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_map() {
        let connector_id = ConnectorId::new();
        let store = Arc::new(InMemoryMirrorStore::new());
        let usecase = ResolveTitlesUseCase::new(store);

        let titles = usecase.execute(&connector_id, &[]).await.unwrap();
        assert!(titles.is_empty());
    }

    #[tokio::test]
    async fn test_all_unknown_yields_empty_map() {
        let connector_id = ConnectorId::new();
        let store = Arc::new(InMemoryMirrorStore::new());
        let usecase = ResolveTitlesUseCase::new(store);

        let titles = usecase
            .execute(&connector_id, &[node_id("x"), node_id("y")])
            .await
            .unwrap();
        assert!(titles.is_empty());
    }

    #[tokio::test]
    async fn test_other_connectors_are_invisible() {
        let owner = ConnectorId::new();
        let store = store_with_file(owner, "A1", "budget.xlsx").await;
        let usecase = ResolveTitlesUseCase::new(store);

        let titles = usecase
            .execute(&ConnectorId::new(), &[node_id("A1")])
            .await
            .unwrap();
        assert!(titles.is_empty());
    }
}
