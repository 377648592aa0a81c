use biodata_storage::{DEFAULT_MAX_AGE, Expiry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Persistence settings for panels and the graph cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelSettings {
    /// Age in milliseconds after which persisted state is discarded
    pub max_age_ms: u64,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            max_age_ms: DEFAULT_MAX_AGE.as_millis() as u64,
        }
    }
}

impl PanelSettings {
    /// The expiry policy these settings describe
    pub fn expiry(&self) -> Expiry {
        Expiry::new(Duration::from_millis(self.max_age_ms))
    }
}
