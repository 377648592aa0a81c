use std::sync::Arc;

use biodata_common::ConditionalSync;
use serde::{Serialize, de::DeserializeOwned};

use crate::StorageError;

mod memory;
pub use memory::*;

#[cfg(not(target_arch = "wasm32"))]
mod fs;
#[cfg(not(target_arch = "wasm32"))]
pub use fs::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod web;
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use web::*;

/// A [DurableStorage] is a synchronous facade over a string-keyed store that
/// outlives a page load.
///
/// Calls complete before returning; there is no suspension point inside any
/// of them, which is what lets the stores built on top treat every
/// write-through as part of one atomic mutation.
pub trait DurableStorage: ConditionalSync {
    /// Retrieve the value (if any) stored against `key`
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Store `value` against `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove `key`; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<T> DurableStorage for Arc<T>
where
    T: DurableStorage + ?Sized,
{
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        T::get_item(self, key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        T::set_item(self, key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        T::remove_item(self, key)
    }
}

/// JSON convenience layer available on every [DurableStorage].
pub trait JsonStorage: DurableStorage {
    /// Read and decode the JSON value stored under `key`
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get_item(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|error| StorageError::Decode {
                    key: key.to_owned(),
                    reason: error.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Encode `value` as JSON and store it under `key`
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(value).map_err(|error| StorageError::Encode(error.to_string()))?;
        self.set_item(key, &raw)
    }
}

impl<S> JsonStorage for S where S: DurableStorage + ?Sized {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};
    use testresult::TestResult;

    use crate::{DurableStorage, JsonStorage, MemoryStorage, StorageError, make_target_storage};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: u32,
    }

    #[test]
    fn it_writes_and_reads_a_value() -> TestResult {
        let (storage, _tempdir) = make_target_storage()?;

        storage.set_item("greeting", "hello")?;
        assert_eq!(storage.get_item("greeting")?, Some("hello".to_owned()));

        storage.remove_item("greeting")?;
        assert_eq!(storage.get_item("greeting")?, None);

        Ok(())
    }

    #[test]
    fn it_tolerates_removing_a_missing_key() -> TestResult {
        let (storage, _tempdir) = make_target_storage()?;
        storage.remove_item("never-written")?;
        Ok(())
    }

    #[test]
    fn it_reads_json_through_a_shared_handle() -> TestResult {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::default());
        let record = Record {
            name: "tables".into(),
            count: 3,
        };

        storage.set_json("record", &record)?;

        assert_eq!(storage.get_json::<Record>("record")?, Some(record));
        Ok(())
    }

    #[test]
    fn it_reports_malformed_json_with_its_key() -> TestResult {
        let storage = MemoryStorage::default();
        storage.set_item("record", "{not json")?;

        match storage.get_json::<Record>("record") {
            Err(StorageError::Decode { key, .. }) => assert_eq!(key, "record"),
            other => panic!("expected a decode error, got {other:?}"),
        }

        Ok(())
    }
}
