use std::sync::Arc;

use biodata_common::SharedCell;
use biodata_storage::{DurableStorage, Expiry, StorageScope, discard};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PanelSettings;

/// Storage key of the panel registry
pub const PANELS_KEY: &str = "searchDialogsData";

/// Field of a panel's result payload naming the data source it came from
pub const PROVENANCE_FIELD: &str = "dataSource";

/// One open search-result panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    /// Registry-assigned id, never reused
    pub id: u64,
    /// The value that was searched for
    pub search_value: String,
    /// Result payload, opaque apart from its provenance tag
    pub result: Value,
    /// Shown in full
    pub visible: bool,
    /// Collapsed into the dock
    pub minimized: bool,
}

impl Panel {
    /// Data source the result came from, when the payload says
    pub fn provenance(&self) -> Option<&str> {
        self.result
            .get(PROVENANCE_FIELD)
            .and_then(Value::as_str)
            .filter(|source| !source.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelEnvelope {
    #[serde(default)]
    search_dialogs: Vec<Panel>,
    #[serde(default)]
    next_dialog_id: u64,
    #[serde(default)]
    owner: Option<StorageScope>,
}

#[derive(Debug, Clone)]
struct PanelState {
    owner: StorageScope,
    panels: Vec<Panel>,
    next_id: u64,
}

impl PanelState {
    fn empty(owner: StorageScope) -> Self {
        Self {
            owner,
            panels: Vec::new(),
            next_id: 1,
        }
    }

    fn envelope(&self) -> PanelEnvelope {
        PanelEnvelope {
            search_dialogs: self.panels.clone(),
            next_dialog_id: self.next_id,
            owner: Some(self.owner.clone()),
        }
    }

    fn find(&mut self, id: u64) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|panel| panel.id == id)
    }
}

/// Ordered registry of open result panels, bound to one owner.
///
/// Insertion order is display order. Every mutation persists the whole
/// registry under [`PANELS_KEY`] together with its owner scope and a
/// timestamp; on load an envelope that is expired, malformed or owned by
/// someone else is removed and the registry starts empty.
pub struct PanelRegistry {
    storage: Arc<dyn DurableStorage>,
    expiry: Expiry,
    state: SharedCell<PanelState>,
}

impl std::fmt::Debug for PanelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelRegistry")
            .field("expiry", &self.expiry)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl PanelRegistry {
    /// Registry for `owner`, restored from `storage` when a usable envelope
    /// exists
    pub fn new(
        storage: Arc<dyn DurableStorage>,
        settings: &PanelSettings,
        owner: StorageScope,
    ) -> Self {
        let registry = Self {
            storage,
            expiry: settings.expiry(),
            state: SharedCell::new(PanelState::empty(owner)),
        };
        registry.load();
        registry
    }

    /// Scope the registry currently belongs to
    pub fn owner(&self) -> StorageScope {
        self.state.read().owner.clone()
    }

    /// Open panels in display order
    pub fn panels(&self) -> Vec<Panel> {
        self.state.read().panels.clone()
    }

    /// A panel by id
    pub fn get(&self, id: u64) -> Option<Panel> {
        self.state
            .read()
            .panels
            .iter()
            .find(|panel| panel.id == id)
            .cloned()
    }

    /// Number of open panels
    pub fn len(&self) -> usize {
        self.state.read().panels.len()
    }

    /// True when no panel is open
    pub fn is_empty(&self) -> bool {
        self.state.read().panels.is_empty()
    }

    /// Id the next added panel will get
    pub fn next_id(&self) -> u64 {
        self.state.read().next_id
    }

    /// Open a visible panel for `search_value` and return it
    pub fn add(&self, search_value: impl Into<String>, result: Value) -> Panel {
        let (panel, envelope) = self.state.update(|state| {
            let panel = Panel {
                id: state.next_id,
                search_value: search_value.into(),
                result,
                visible: true,
                minimized: false,
            };
            state.next_id = state.next_id.saturating_add(1);
            state.panels.push(panel.clone());
            (panel, state.envelope())
        });
        self.persist(&envelope);
        panel
    }

    /// Collapse a panel. Returns false when there is no such panel.
    pub fn minimize(&self, id: u64) -> bool {
        self.set_minimized(id, true)
    }

    /// Expand a collapsed panel. Returns false when there is no such panel.
    pub fn restore(&self, id: u64) -> bool {
        self.set_minimized(id, false)
    }

    fn set_minimized(&self, id: u64, minimized: bool) -> bool {
        self.mutate(|state| {
            let panel = state.find(id)?;
            panel.minimized = minimized;
            panel.visible = !minimized;
            Some(())
        })
        .is_some()
    }

    /// Remove a panel. Returns false when there is no such panel.
    pub fn close(&self, id: u64) -> bool {
        self.mutate(|state| {
            let index = state.panels.iter().position(|panel| panel.id == id)?;
            state.panels.remove(index);
            Some(())
        })
        .is_some()
    }

    /// Remove a single panel's results; same as [`PanelRegistry::close`]
    pub fn clear_single(&self, id: u64) -> bool {
        self.close(id)
    }

    /// Remove every panel. Ids keep counting up.
    pub fn clear_all(&self) {
        self.mutate(|state| {
            state.panels.clear();
            Some(())
        });
    }

    /// Remove every panel whose result came from `data_source`.
    ///
    /// Panels without a provenance tag are kept. Returns how many panels were
    /// removed; an empty `data_source` removes nothing.
    pub fn clear_by_provenance(&self, data_source: &str) -> usize {
        if data_source.is_empty() {
            return 0;
        }
        self.mutate(|state| {
            let before = state.panels.len();
            state
                .panels
                .retain(|panel| panel.provenance() != Some(data_source));
            let removed = before - state.panels.len();
            tracing::debug!(data_source, removed, "Cleared panels by provenance");
            Some(removed)
        })
        .unwrap_or_default()
    }

    /// Replace the whole panel list. The id counter never moves backwards,
    /// so `next_id` is raised past every id in `panels` if needed.
    ///
    /// Returns false and changes nothing when an id leaves no room for the
    /// counter to advance.
    pub fn set_panels(&self, panels: Vec<Panel>, next_id: u64) -> bool {
        self.mutate(|state| {
            state.next_id = next_id_after(&panels, next_id.max(state.next_id))?;
            state.panels = panels;
            Some(())
        })
        .is_some()
    }

    /// Restore from storage. Returns true when a usable envelope was found.
    ///
    /// Expired, malformed and foreign envelopes are removed from storage and
    /// the registry is reset to empty. An envelope whose ids leave no room
    /// for the counter to advance counts as malformed.
    pub fn load(&self) -> bool {
        let owner = self.owner();
        let Some(stamped) = self
            .expiry
            .recover::<_, PanelEnvelope>(self.storage.as_ref(), PANELS_KEY)
        else {
            self.state.replace(PanelState::empty(owner));
            return false;
        };

        let envelope = stamped.value;
        if envelope.owner.as_ref() != Some(&owner) {
            tracing::debug!(
                owner = %owner,
                stored = ?envelope.owner,
                "Discarding panels persisted for another owner"
            );
            discard(self.storage.as_ref(), PANELS_KEY);
            self.state.replace(PanelState::empty(owner));
            return false;
        }

        let Some(next_id) = next_id_after(&envelope.search_dialogs, envelope.next_dialog_id)
        else {
            tracing::warn!(
                next_dialog_id = envelope.next_dialog_id,
                "Discarding panels with an exhausted id counter"
            );
            discard(self.storage.as_ref(), PANELS_KEY);
            self.state.replace(PanelState::empty(owner));
            return false;
        };

        self.state.replace(PanelState {
            owner,
            panels: envelope.search_dialogs,
            next_id,
        });
        true
    }

    /// Remove the persisted envelope; memory is left as it is
    pub fn clear_storage(&self) {
        discard(self.storage.as_ref(), PANELS_KEY);
    }

    /// Rebind to `owner`: drop the in-memory panels and load whatever the
    /// new owner has persisted. Returns the result of the load.
    pub fn switch_owner(&self, owner: StorageScope) -> bool {
        if self.owner() == owner {
            return false;
        }
        tracing::debug!(owner = %owner, "Switching panel owner");
        self.state.replace(PanelState::empty(owner));
        self.load()
    }

    // Applies `change` under the write lock and persists when it returns
    // Some. Nothing is persisted for a change that found nothing to do.
    fn mutate<R>(&self, change: impl FnOnce(&mut PanelState) -> Option<R>) -> Option<R> {
        let (outcome, envelope) = self.state.update(|state| {
            let outcome = change(state);
            let envelope = outcome.is_some().then(|| state.envelope());
            (outcome, envelope)
        });
        if let Some(envelope) = envelope {
            self.persist(&envelope);
        }
        outcome
    }

    fn persist(&self, envelope: &PanelEnvelope) {
        if let Err(error) = self
            .expiry
            .store(self.storage.as_ref(), PANELS_KEY, envelope)
        {
            tracing::error!(%error, "Failed to persist panels");
        }
    }
}

// Smallest counter value at or above `next_id` that is past every panel id,
// or None when that leaves no room to hand out another id.
fn next_id_after(panels: &[Panel], next_id: u64) -> Option<u64> {
    panels
        .iter()
        .try_fold(next_id.max(1), |next, panel| {
            Some(next.max(panel.id.checked_add(1)?))
        })
        .filter(|next| *next < u64::MAX)
}

#[cfg(test)]
mod tests {
    use biodata_storage::{FailingStorage, JsonStorage, MemoryStorage};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    fn registry_over(storage: &MemoryStorage, owner: StorageScope) -> PanelRegistry {
        PanelRegistry::new(
            Arc::new(storage.clone()),
            &PanelSettings::default(),
            owner,
        )
    }

    #[test]
    fn it_assigns_increasing_ids() {
        let registry = registry_over(&MemoryStorage::default(), StorageScope::user(7));

        let first = registry.add("BRCA1", json!({"dataSource": "biodata"}));
        let second = registry.add("TP53", json!({}));
        registry.close(first.id);
        let third = registry.add("EGFR", json!({}));

        assert_eq!((first.id, second.id, third.id), (1, 2, 3));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn it_restores_exactly_what_minimize_changed() {
        let registry = registry_over(&MemoryStorage::default(), StorageScope::user(7));
        let panel = registry.add("BRCA1", json!({}));

        assert!(registry.minimize(panel.id));
        assert_eq!(
            registry.get(panel.id).map(|p| (p.visible, p.minimized)),
            Some((false, true))
        );
        assert!(registry.restore(panel.id));

        assert_eq!(registry.get(panel.id), Some(panel));
    }

    #[test]
    fn it_ignores_unknown_ids() {
        let registry = registry_over(&MemoryStorage::default(), StorageScope::user(7));

        assert!(!registry.minimize(42));
        assert!(!registry.close(42));
    }

    #[test]
    fn it_keeps_untagged_panels_when_clearing_by_provenance() {
        let registry = registry_over(&MemoryStorage::default(), StorageScope::user(7));
        registry.add("a", json!({"dataSource": "login"}));
        registry.add("b", json!({"dataSource": "biodata"}));
        registry.add("c", json!({"rows": []}));
        registry.add("d", json!({"dataSource": "login"}));

        let removed = registry.clear_by_provenance("login");

        assert_eq!(removed, 2);
        assert_eq!(
            registry
                .panels()
                .iter()
                .map(|panel| panel.search_value.as_str())
                .collect::<Vec<_>>(),
            vec!["b", "c"]
        );
    }

    #[test]
    fn it_survives_a_reload() {
        let storage = MemoryStorage::default();
        let registry = registry_over(&storage, StorageScope::user(7));
        registry.add("BRCA1", json!({}));
        registry.add("TP53", json!({}));
        registry.clear_single(1);

        let reloaded = registry_over(&storage, StorageScope::user(7));

        assert_eq!(reloaded.panels(), registry.panels());
        assert_eq!(reloaded.add("EGFR", json!({})).id, 3);
    }

    #[test_log::test]
    fn it_discards_expired_registries() -> TestResult {
        let storage = MemoryStorage::default();
        storage.set_json(
            PANELS_KEY,
            &json!({
                "searchDialogs": [
                    {"id": 1, "searchValue": "old", "result": {}, "visible": true, "minimized": false}
                ],
                "nextDialogId": 2,
                "owner": "7",
                "timestamp": 1_000
            }),
        )?;

        let registry = registry_over(&storage, StorageScope::user(7));

        assert!(registry.is_empty());
        assert_eq!(storage.get_item(PANELS_KEY)?, None);
        Ok(())
    }

    #[test_log::test]
    fn it_never_shows_another_owners_panels() -> TestResult {
        let storage = MemoryStorage::default();
        registry_over(&storage, StorageScope::user(7)).add("secret", json!({}));

        let registry = registry_over(&storage, StorageScope::user(8));

        assert!(registry.is_empty());
        assert_eq!(storage.get_item(PANELS_KEY)?, None);
        Ok(())
    }

    #[test]
    fn it_switches_owner() {
        let storage = MemoryStorage::default();
        let registry = registry_over(&storage, StorageScope::user(7));
        registry.add("BRCA1", json!({}));

        assert!(!registry.switch_owner(StorageScope::anonymous()));

        assert!(registry.is_empty());
        assert_eq!(registry.owner(), StorageScope::anonymous());
    }

    #[test]
    fn it_never_lowers_the_id_counter() {
        let registry = registry_over(&MemoryStorage::default(), StorageScope::user(7));
        let panel = Panel {
            id: 10,
            search_value: "x".into(),
            result: json!({}),
            visible: true,
            minimized: false,
        };

        assert!(registry.set_panels(vec![panel], 1));

        assert_eq!(registry.next_id(), 11);
    }

    #[test]
    fn it_clears_everything_but_keeps_counting() -> TestResult {
        let storage = MemoryStorage::default();
        let registry = registry_over(&storage, StorageScope::user(7));
        registry.add("BRCA1", json!({}));
        registry.add("TP53", json!({}));

        registry.clear_all();

        assert!(registry.is_empty());
        assert_eq!(registry.add("EGFR", json!({})).id, 3);
        let reloaded = registry_over(&storage, StorageScope::user(7));
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.next_id(), 4);
        Ok(())
    }

    #[test_log::test]
    fn it_discards_registries_with_an_exhausted_counter() -> TestResult {
        let storage = MemoryStorage::default();
        Expiry::default().store(
            &storage,
            PANELS_KEY,
            &json!({"searchDialogs": [], "nextDialogId": u64::MAX, "owner": "7"}),
        )?;

        let registry = registry_over(&storage, StorageScope::user(7));

        assert!(registry.is_empty());
        assert_eq!(registry.add("x", json!({})).id, 1);
        Ok(())
    }

    #[test_log::test]
    fn it_discards_registries_with_an_id_at_the_limit() -> TestResult {
        let storage = MemoryStorage::default();
        Expiry::default().store(
            &storage,
            PANELS_KEY,
            &json!({
                "searchDialogs": [
                    {"id": u64::MAX, "searchValue": "x", "result": {}, "visible": true, "minimized": false}
                ],
                "nextDialogId": 2,
                "owner": "7"
            }),
        )?;

        let registry = registry_over(&storage, StorageScope::user(7));

        assert!(registry.is_empty());
        assert_eq!(storage.get_item(PANELS_KEY)?, None);
        Ok(())
    }

    #[test]
    fn it_refuses_panel_lists_that_exhaust_the_counter() {
        let registry = registry_over(&MemoryStorage::default(), StorageScope::user(7));
        registry.add("BRCA1", json!({}));
        let panel = Panel {
            id: u64::MAX,
            search_value: "x".into(),
            result: json!({}),
            visible: true,
            minimized: false,
        };

        assert!(!registry.set_panels(vec![panel], 1));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.next_id(), 2);
    }

    #[test_log::test]
    fn it_resets_memory_when_reloading_an_expired_registry() -> TestResult {
        let storage = MemoryStorage::default();
        let registry = registry_over(&storage, StorageScope::user(7));
        registry.add("BRCA1", json!({}));
        storage.set_json(
            PANELS_KEY,
            &json!({"searchDialogs": [], "nextDialogId": 5, "owner": "7", "timestamp": 1_000}),
        )?;

        assert!(!registry.load());

        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), 1);
        Ok(())
    }

    #[test_log::test]
    fn it_keeps_memory_authoritative_when_writes_fail() {
        let storage = FailingStorage::new(MemoryStorage::default());
        storage.reject_writes(true);
        let registry = PanelRegistry::new(
            Arc::new(storage),
            &PanelSettings::default(),
            StorageScope::user(7),
        );

        registry.add("BRCA1", json!({}));

        assert_eq!(registry.len(), 1);
    }
}
