use serde::{Deserialize, Serialize};

/// Name of the credentials-bearing database guarded by capability flags
pub const DEFAULT_RESTRICTED_RESOURCE: &str = "login";

/// Where unauthenticated navigation is sent
pub const DEFAULT_SIGN_IN_ROUTE: &str = "/login";

/// Where authenticated but unauthorized navigation is sent
pub const DEFAULT_LANDING_ROUTE: &str = "/dashboard";

/// Access-control configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessSettings {
    /// Resource class subject to the read/write capability flags
    pub restricted_resource: String,
    /// Redirect target for unauthenticated navigation
    pub sign_in_route: String,
    /// Redirect target for navigation denied to a signed-in user
    pub landing_route: String,
    /// Keep writing the legacy `user` key next to `userInfo`
    pub mirror_legacy_key: bool,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            restricted_resource: DEFAULT_RESTRICTED_RESOURCE.into(),
            sign_in_route: DEFAULT_SIGN_IN_ROUTE.into(),
            landing_route: DEFAULT_LANDING_ROUTE.into(),
            mirror_legacy_key: true,
        }
    }
}
