use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Scope token used when nobody is signed in
pub const ANONYMOUS_SCOPE: &str = "anonymous";

/// Identifies whose cached state a storage entry belongs to.
///
/// Every per-user namespace derives its key from the same token (the signed
/// in user's numeric id, or `anonymous`), so switching sessions switches
/// every cache at once and a previous user's entries are never read back.
///
/// ```
/// use biodata_storage::StorageScope;
///
/// assert_eq!(StorageScope::user(7).key("knowledgeGraphData"), "knowledgeGraphData_7");
/// assert_eq!(StorageScope::anonymous().key("knowledgeGraphData"), "knowledgeGraphData_anonymous");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageScope(String);

impl Default for StorageScope {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl StorageScope {
    /// The scope used when no user is signed in
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_SCOPE.to_owned())
    }

    /// The scope owned by `user`
    pub fn user(user: impl Display) -> Self {
        Self(user.to_string())
    }

    /// The scope owned by `user`, falling back to [StorageScope::anonymous]
    pub fn for_user<U: Display>(user: Option<U>) -> Self {
        user.map(Self::user).unwrap_or_default()
    }

    /// True for the anonymous scope
    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_SCOPE
    }

    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for `namespace` within this scope
    pub fn key(&self, namespace: &str) -> String {
        format!("{namespace}_{}", self.0)
    }
}

impl Display for StorageScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
