use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage area could not be obtained (no window, storage disabled)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Reading an entry failed
    #[error("Failed to read '{key}': {reason}")]
    Read {
        /// Key being read
        key: String,
        /// Backend specific failure description
        reason: String,
    },

    /// Writing an entry failed, e.g. because the quota was exceeded
    #[error("Failed to write '{key}': {reason}")]
    Write {
        /// Key being written
        key: String,
        /// Backend specific failure description
        reason: String,
    },

    /// Removing an entry failed
    #[error("Failed to remove '{key}': {reason}")]
    Remove {
        /// Key being removed
        key: String,
        /// Backend specific failure description
        reason: String,
    },

    /// A value could not be serialized to JSON
    #[error("Failed to encode a value: {0}")]
    Encode(String),

    /// A stored value was not valid JSON for the expected shape
    #[error("Failed to decode '{key}': {reason}")]
    Decode {
        /// Key holding the malformed value
        key: String,
        /// Parser failure description
        reason: String,
    },
}
