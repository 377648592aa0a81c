//! Test doubles for code built on [DurableStorage].

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{DurableStorage, MemoryStorage, StorageError};

#[cfg(not(target_arch = "wasm32"))]
use crate::FileSystemStorage;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use crate::WebStorage;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
type MakeTargetStorageOutput = (WebStorage, ());
#[cfg(not(target_arch = "wasm32"))]
type MakeTargetStorageOutput = (FileSystemStorage, tempfile::TempDir);

/// Creates a platform-specific persisted [`DurableStorage`], for use in tests
pub fn make_target_storage() -> anyhow::Result<MakeTargetStorageOutput> {
    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    return Ok((WebStorage::local()?, ()));
    #[cfg(not(target_arch = "wasm32"))]
    {
        let root = tempfile::tempdir()?;
        let storage = FileSystemStorage::new(root.path())?;
        Ok((storage, root))
    }
}

/// [MemoryStorage] that can be told to reject writes or removals, the way a
/// browser does once the origin's quota is exhausted.
#[derive(Clone, Debug, Default)]
pub struct FailingStorage {
    inner: MemoryStorage,
    reject_writes: Arc<AtomicBool>,
    reject_removals: Arc<AtomicBool>,
}

impl FailingStorage {
    /// Wrap an existing memory storage
    pub fn new(inner: MemoryStorage) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    /// Start or stop rejecting `set_item`
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Start or stop rejecting `remove_item`
    pub fn reject_removals(&self, reject: bool) {
        self.reject_removals.store(reject, Ordering::SeqCst);
    }

    /// The underlying entries
    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }
}

impl DurableStorage for FailingStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write {
                key: key.to_owned(),
                reason: "QuotaExceededError".into(),
            });
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if self.reject_removals.load(Ordering::SeqCst) {
            return Err(StorageError::Remove {
                key: key.to_owned(),
                reason: "storage is read-only".into(),
            });
        }
        self.inner.remove_item(key)
    }
}
