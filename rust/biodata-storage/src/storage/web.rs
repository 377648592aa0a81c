//! Browser storage areas.
//!
//! `localStorage` holds the session and the result-panel registry; the
//! knowledge graph lives in `sessionStorage` so it disappears with the tab.

use crate::{DurableStorage, StorageError};

/// [DurableStorage] over one of the window's `Storage` areas.
#[derive(Clone, Debug)]
pub struct WebStorage {
    area: web_sys::Storage,
}

impl WebStorage {
    /// The window's `localStorage`
    pub fn local() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no global window".into()))?;
        let area = window
            .local_storage()
            .map_err(|error| StorageError::Unavailable(format!("{error:?}")))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".into()))?;
        Ok(Self { area })
    }

    /// The window's `sessionStorage`
    pub fn session() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no global window".into()))?;
        let area = window
            .session_storage()
            .map_err(|error| StorageError::Unavailable(format!("{error:?}")))?
            .ok_or_else(|| StorageError::Unavailable("sessionStorage is disabled".into()))?;
        Ok(Self { area })
    }
}

impl DurableStorage for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.area.get_item(key).map_err(|error| StorageError::Read {
            key: key.to_owned(),
            reason: format!("{error:?}"),
        })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Throws QuotaExceededError when the origin is out of space
        self.area
            .set_item(key, value)
            .map_err(|error| StorageError::Write {
                key: key.to_owned(),
                reason: format!("{error:?}"),
            })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.area
            .remove_item(key)
            .map_err(|error| StorageError::Remove {
                key: key.to_owned(),
                reason: format!("{error:?}"),
            })
    }
}
