use thiserror::Error;

/// Errors produced when a permission decision is turned into a `Result`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The current session may not perform the requested operation
    #[error("Access denied: {reason}")]
    Denied {
        /// Human readable reason from the [`Decision`](crate::Decision)
        reason: String,
    },
}
