use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default backend origin
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default request timeout. Full-database searches can legitimately run
/// for several minutes.
pub const DEFAULT_TIMEOUT_MS: u64 = 600_000;

/// Endpoints whose requests carry the caller's identity by default
pub const DEFAULT_IDENTITY_ENDPOINTS: &[&str] = &["/api/database/tables", "/api/database/query"];

/// Client configuration. Fixed for the lifetime of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSettings {
    /// Backend origin requests are resolved against
    pub base_url: String,
    /// Timeout applied to every request, in milliseconds
    pub timeout_ms: u64,
    /// Path fragments of identity-sensitive endpoints; a request whose path
    /// contains one of them gets `userId` / `userType` injected
    pub identity_endpoints: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            identity_endpoints: DEFAULT_IDENTITY_ENDPOINTS
                .iter()
                .map(|endpoint| endpoint.to_string())
                .collect(),
        }
    }
}

impl ClientSettings {
    /// The request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
