use std::sync::Arc;

use biodata_common::SharedCell;
use biodata_storage::{DurableStorage, Expiry, StorageScope, discard};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::PanelSettings;

/// Namespace of the per-user graph cache key
pub const GRAPH_NAMESPACE: &str = "knowledgeGraphData";

/// Nodes and links of a knowledge graph. Both are opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// Graph nodes
    #[serde(default)]
    pub nodes: Vec<Value>,
    /// Graph edges
    #[serde(default)]
    pub links: Vec<Value>,
    /// Statistics computed when the graph was built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Map<String, Value>>,
}

/// What the cache holds, and the shape it is persisted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphState {
    /// Description of the file the graph was loaded from
    pub current_file: Option<Value>,
    /// The graph currently displayed, possibly filtered
    pub graph_data: GraphData,
    /// The graph as loaded, before any filtering
    pub original_graph_data: GraphData,
    /// Latest statistics
    pub statistics: Map<String, Value>,
    /// True when the loaded graph has at least one node
    pub has_data: bool,
}

/// Last loaded knowledge graph of the current user.
///
/// Persisted under `knowledgeGraphData_<scope>`, usually in session storage,
/// with the same expiry policy as the panels. Filtering changes only the
/// displayed copy and is not persisted; a reload shows the graph as it was
/// last set.
pub struct GraphCache {
    storage: Arc<dyn DurableStorage>,
    expiry: Expiry,
    scope: SharedCell<StorageScope>,
    state: SharedCell<GraphState>,
}

impl std::fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCache")
            .field("scope", &*self.scope.read())
            .field("has_data", &self.state.read().has_data)
            .finish_non_exhaustive()
    }
}

impl GraphCache {
    /// Cache for `scope`, restored from `storage` when possible
    pub fn new(
        storage: Arc<dyn DurableStorage>,
        settings: &PanelSettings,
        scope: StorageScope,
    ) -> Self {
        let cache = Self {
            storage,
            expiry: settings.expiry(),
            scope: SharedCell::new(scope),
            state: SharedCell::default(),
        };
        cache.load();
        cache
    }

    /// Storage key for the current scope
    pub fn key(&self) -> String {
        self.scope.read().key(GRAPH_NAMESPACE)
    }

    /// Scope the cache belongs to
    pub fn scope(&self) -> StorageScope {
        self.scope.snapshot()
    }

    /// Copy of everything the cache holds
    pub fn state(&self) -> GraphState {
        self.state.snapshot()
    }

    /// The graph currently displayed
    pub fn graph(&self) -> GraphData {
        self.state.read().graph_data.clone()
    }

    /// True when a non-empty graph is loaded
    pub fn has_data(&self) -> bool {
        self.state.read().has_data
    }

    /// Replace the graph with a freshly loaded one
    pub fn set_graph(&self, data: GraphData, file: Option<Value>) {
        let state = GraphState {
            current_file: file,
            statistics: data.statistics.clone().unwrap_or_default(),
            has_data: !data.nodes.is_empty(),
            original_graph_data: data.clone(),
            graph_data: data,
        };
        tracing::debug!(
            nodes = state.graph_data.nodes.len(),
            links = state.graph_data.links.len(),
            "Graph loaded"
        );
        self.state.replace(state.clone());
        self.persist(&state);
    }

    /// Replace the statistics
    pub fn update_statistics(&self, statistics: Map<String, Value>) {
        let state = self.state.update(|state| {
            state.statistics = statistics;
            state.clone()
        });
        self.persist(&state);
    }

    /// Show a filtered view, or the original graph again for `None`
    pub fn update_filtered(&self, filtered: Option<GraphData>) {
        self.state.update(|state| {
            state.graph_data = match filtered {
                Some(filtered) => GraphData {
                    statistics: None,
                    ..filtered
                },
                None => state.original_graph_data.clone(),
            };
        });
    }

    /// Forget the graph in memory and in storage
    pub fn clear(&self) {
        self.state.replace(GraphState::default());
        discard(self.storage.as_ref(), &self.key());
    }

    /// Restore from storage. Returns true when a usable entry was found.
    pub fn load(&self) -> bool {
        let key = self.key();
        match self
            .expiry
            .recover::<_, GraphState>(self.storage.as_ref(), &key)
        {
            Some(stamped) => {
                self.state.replace(stamped.value);
                true
            }
            None => false,
        }
    }

    /// Rebind to `scope`, dropping the in-memory graph and loading whatever
    /// that scope has persisted
    pub fn switch_scope(&self, scope: StorageScope) -> bool {
        if *self.scope.read() == scope {
            return false;
        }
        self.scope.replace(scope);
        self.state.replace(GraphState::default());
        self.load()
    }

    fn persist(&self, state: &GraphState) {
        let key = self.key();
        if let Err(error) = self.expiry.store(self.storage.as_ref(), &key, state) {
            tracing::error!(key, %error, "Failed to persist graph");
        }
    }
}

#[cfg(test)]
mod tests {
    use biodata_storage::{DurableStorage, JsonStorage, MemoryStorage};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    fn graph() -> GraphData {
        GraphData {
            nodes: vec![json!({"id": "BRCA1"}), json!({"id": "TP53"})],
            links: vec![json!({"source": "BRCA1", "target": "TP53"})],
            statistics: Some(Map::from_iter([("nodeCount".into(), json!(2))])),
        }
    }

    fn cache_over(storage: &MemoryStorage, scope: StorageScope) -> GraphCache {
        GraphCache::new(Arc::new(storage.clone()), &PanelSettings::default(), scope)
    }

    #[test]
    fn it_keys_the_cache_by_user() {
        let storage = MemoryStorage::default();

        assert_eq!(
            cache_over(&storage, StorageScope::user(7)).key(),
            "knowledgeGraphData_7"
        );
        assert_eq!(
            cache_over(&storage, StorageScope::anonymous()).key(),
            "knowledgeGraphData_anonymous"
        );
    }

    #[test]
    fn it_restores_the_original_after_filtering() {
        let cache = cache_over(&MemoryStorage::default(), StorageScope::user(7));
        cache.set_graph(graph(), Some(json!({"name": "genes.xlsx"})));

        cache.update_filtered(Some(GraphData {
            nodes: vec![json!({"id": "BRCA1"})],
            ..GraphData::default()
        }));
        assert_eq!(cache.graph().nodes.len(), 1);

        cache.update_filtered(None);
        assert_eq!(cache.graph(), graph());
        assert_eq!(cache.state().statistics["nodeCount"], json!(2));
    }

    #[test]
    fn it_survives_a_reload() {
        let storage = MemoryStorage::default();
        cache_over(&storage, StorageScope::user(7)).set_graph(graph(), None);

        let reloaded = cache_over(&storage, StorageScope::user(7));

        assert!(reloaded.has_data());
        assert_eq!(reloaded.state().original_graph_data, graph());
    }

    #[test]
    fn it_treats_an_empty_graph_as_no_data() {
        let cache = cache_over(&MemoryStorage::default(), StorageScope::user(7));

        cache.set_graph(GraphData::default(), None);

        assert!(!cache.has_data());
    }

    #[test_log::test]
    fn it_discards_expired_graphs() -> TestResult {
        let storage = MemoryStorage::default();
        storage.set_json(
            "knowledgeGraphData_7",
            &json!({"hasData": true, "graphData": {"nodes": [1], "links": []}, "timestamp": 5}),
        )?;

        let cache = cache_over(&storage, StorageScope::user(7));

        assert!(!cache.has_data());
        assert_eq!(storage.get_item("knowledgeGraphData_7")?, None);
        Ok(())
    }

    #[test]
    fn it_isolates_users() -> TestResult {
        let storage = MemoryStorage::default();
        let cache = cache_over(&storage, StorageScope::user(7));
        cache.set_graph(graph(), None);

        assert!(!cache.switch_scope(StorageScope::user(8)));
        assert!(!cache.has_data());
        assert!(storage.get_item("knowledgeGraphData_7")?.is_some());

        assert!(cache.switch_scope(StorageScope::user(7)));
        assert!(cache.has_data());
        Ok(())
    }

    #[test]
    fn it_persists_statistics_updates() {
        let storage = MemoryStorage::default();
        let cache = cache_over(&storage, StorageScope::user(7));
        cache.set_graph(graph(), None);

        cache.update_statistics(Map::from_iter([("nodeCount".into(), json!(1))]));

        let reloaded = cache_over(&storage, StorageScope::user(7));
        assert_eq!(reloaded.state().statistics["nodeCount"], json!(1));
        assert_eq!(reloaded.graph(), graph());
    }

    #[test]
    fn it_clears_memory_and_storage() -> TestResult {
        let storage = MemoryStorage::default();
        let cache = cache_over(&storage, StorageScope::user(7));
        cache.set_graph(graph(), None);

        cache.clear();

        assert_eq!(cache.state(), GraphState::default());
        assert_eq!(storage.get_item("knowledgeGraphData_7")?, None);
        Ok(())
    }
}
