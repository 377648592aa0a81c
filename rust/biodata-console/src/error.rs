use biodata_network::ApiError;
use biodata_storage::StorageError;
use thiserror::Error;

/// Errors that stop the console from starting.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Durable storage could not be opened
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The HTTP client could not be built
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Settings did not parse
    #[error("Invalid console settings: {0}")]
    Settings(#[from] serde_json::Error),
}
