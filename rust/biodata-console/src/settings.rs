use biodata_access::AccessSettings;
use biodata_network::ClientSettings;
use biodata_panels::PanelSettings;
use serde::{Deserialize, Serialize};

use crate::ConsoleError;

/// Everything configurable about the console. Missing sections and fields
/// take their defaults.
///
/// ```
/// use biodata_console::ConsoleSettings;
///
/// let settings = ConsoleSettings::from_json(r#"{"client":{"baseUrl":"https://db.example.org"}}"#)?;
/// assert_eq!(settings.client.base_url, "https://db.example.org");
/// assert_eq!(settings.access.restricted_resource, "login");
/// # Ok::<(), biodata_console::ConsoleError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// HTTP client
    pub client: ClientSettings,
    /// Access control
    pub access: AccessSettings,
    /// Panel and graph persistence
    pub panels: PanelSettings,
}

impl ConsoleSettings {
    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self, ConsoleError> {
        Ok(serde_json::from_str(json)?)
    }
}
