//! Time-based expiry for persisted client state.
//!
//! Cached state is written inside a [Stamped] envelope carrying the epoch
//! millisecond it was saved at. On load, an envelope older than the policy's
//! maximum age is discarded wholesale and removed from storage; there is no
//! partial expiry of individual entries.

use std::time::Duration;

use biodata_common::time::epoch_millis;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{DurableStorage, JsonStorage, StorageError};

/// Default lifetime of cached client state (24 hours)
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// A value together with the time it was persisted.
///
/// The value's fields are flattened next to `timestamp`, so a stamped
/// registry serializes as `{"searchDialogs": [...], "timestamp": 1700...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    /// The persisted value
    #[serde(flatten)]
    pub value: T,
    /// Epoch milliseconds at which the value was written. Envelopes without a
    /// timestamp are treated as written at the epoch, i.e. long expired.
    #[serde(default)]
    pub timestamp: u64,
}

/// Expiry policy shared by every cached namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    max_age: Duration,
}

impl Default for Expiry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}

impl Expiry {
    /// A policy discarding anything older than `max_age`
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// Maximum age of a persisted envelope
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// True when an envelope written at `timestamp` is still usable at `now`
    /// (both in epoch milliseconds).
    pub fn is_fresh(&self, timestamp: u64, now: u64) -> bool {
        u128::from(now.saturating_sub(timestamp)) < self.max_age.as_millis()
    }

    /// Wrap `value` in an envelope stamped with the current time and write it
    /// to `key`.
    pub fn store<S, T>(&self, storage: &S, key: &str, value: &T) -> Result<(), StorageError>
    where
        S: DurableStorage + ?Sized,
        T: Serialize,
    {
        let envelope = Stamped {
            value,
            timestamp: epoch_millis(),
        };
        storage.set_json(key, &envelope)
    }

    /// Load the envelope under `key` if it exists, parses and is fresh.
    ///
    /// Malformed and expired envelopes are removed from storage. None of the
    /// failure modes are surfaced: the caller simply starts from empty state.
    pub fn recover<S, T>(&self, storage: &S, key: &str) -> Option<Stamped<T>>
    where
        S: DurableStorage + ?Sized,
        T: DeserializeOwned,
    {
        match storage.get_json::<Stamped<T>>(key) {
            Ok(Some(envelope)) if self.is_fresh(envelope.timestamp, epoch_millis()) => {
                Some(envelope)
            }
            Ok(Some(envelope)) => {
                tracing::debug!(key, timestamp = envelope.timestamp, "Discarding expired state");
                discard(storage, key);
                None
            }
            Ok(None) => None,
            Err(error @ StorageError::Decode { .. }) => {
                tracing::warn!(key, %error, "Discarding malformed state");
                discard(storage, key);
                None
            }
            Err(error) => {
                tracing::error!(key, %error, "Failed to read persisted state");
                None
            }
        }
    }
}

/// Remove `key`, logging rather than propagating a failure.
pub fn discard<S>(storage: &S, key: &str)
where
    S: DurableStorage + ?Sized,
{
    if let Err(error) = storage.remove_item(key) {
        tracing::error!(key, %error, "Failed to remove persisted state");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use testresult::TestResult;

    use super::*;
    use crate::MemoryStorage;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Registry {
        next_dialog_id: u64,
    }

    const HOUR_MS: u64 = 60 * 60 * 1000;

    #[test]
    fn it_treats_the_boundary_as_expired() {
        let expiry = Expiry::default();
        let now = 100 * HOUR_MS;

        assert!(expiry.is_fresh(now - 23 * HOUR_MS, now));
        assert!(!expiry.is_fresh(now - 24 * HOUR_MS, now));
        assert!(!expiry.is_fresh(now - 25 * HOUR_MS, now));
    }

    #[test]
    fn it_recovers_a_fresh_envelope() -> TestResult {
        let storage = MemoryStorage::default();
        let expiry = Expiry::default();

        expiry.store(&storage, "registry", &Registry { next_dialog_id: 4 })?;
        let envelope = expiry.recover::<_, Registry>(&storage, "registry");

        assert_eq!(
            envelope.map(|stamped| stamped.value),
            Some(Registry { next_dialog_id: 4 })
        );
        Ok(())
    }

    #[test]
    fn it_flattens_the_value_next_to_the_timestamp() -> TestResult {
        let storage = MemoryStorage::default();
        Expiry::default().store(&storage, "registry", &Registry { next_dialog_id: 2 })?;

        let raw: serde_json::Value = storage.get_json("registry")?.unwrap_or_default();

        assert_eq!(raw["nextDialogId"], 2);
        assert!(raw["timestamp"].as_u64().is_some());
        Ok(())
    }

    #[test]
    fn it_discards_and_removes_an_expired_envelope() -> TestResult {
        let storage = MemoryStorage::default();
        let stale = epoch_millis() - 25 * HOUR_MS;
        storage.set_item(
            "registry",
            &format!(r#"{{"nextDialogId":9,"timestamp":{stale}}}"#),
        )?;

        assert!(Expiry::default().recover::<_, Registry>(&storage, "registry").is_none());
        assert_eq!(storage.get_item("registry")?, None);
        Ok(())
    }

    #[test]
    fn it_discards_an_envelope_without_a_timestamp() -> TestResult {
        let storage = MemoryStorage::default();
        storage.set_item("registry", r#"{"nextDialogId":9}"#)?;

        assert!(Expiry::default().recover::<_, Registry>(&storage, "registry").is_none());
        assert!(storage.is_empty());
        Ok(())
    }

    #[test]
    fn it_discards_and_removes_malformed_state() -> TestResult {
        let storage = MemoryStorage::default();
        storage.set_item("registry", "][")?;

        assert!(Expiry::default().recover::<_, Registry>(&storage, "registry").is_none());
        assert_eq!(storage.get_item("registry")?, None);
        Ok(())
    }
}
