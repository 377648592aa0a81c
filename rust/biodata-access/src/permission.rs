use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{AccessError, DEFAULT_RESTRICTED_RESOURCE, Session, SessionStore};

/// What a caller intends to do with a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Read rows, list tables, run read-only queries
    #[default]
    Read,
    /// Insert, update, delete, import, DDL
    Write,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Read => f.write_str("read"),
            Operation::Write => f.write_str("write"),
        }
    }
}

/// Outcome of a permission check. Computed per call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the operation may proceed
    pub allowed: bool,
    /// Why, in words suitable for a notification
    pub reason: String,
}

impl Decision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: "allowed".into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }

    /// `Ok(())` when allowed, [`AccessError::Denied`] otherwise
    pub fn into_result(self) -> Result<(), AccessError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AccessError::Denied {
                reason: self.reason,
            })
        }
    }
}

/// Decide whether `session` may perform `operation` on `resource`.
///
/// Any signed-in session may read and write ordinary resources. The
/// `restricted` resource additionally requires the capability flag matching
/// the operation; role and admin status play no part in that check.
pub fn evaluate(
    session: &Session,
    resource: &str,
    operation: Operation,
    restricted: &str,
) -> Decision {
    if !session.is_authenticated() {
        return Decision::deny("not signed in");
    }

    if resource == restricted {
        let granted = match operation {
            Operation::Read => session.can_read_restricted,
            Operation::Write => session.can_write_restricted,
        };
        if !granted {
            return Decision::deny(format!(
                "missing {operation} access to restricted resource '{restricted}'"
            ));
        }
    }

    Decision::allow()
}

/// [`evaluate`] bound to the shared [`SessionStore`].
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    store: Arc<SessionStore>,
    restricted_resource: String,
}

impl PermissionEvaluator {
    /// Evaluator guarding the default restricted resource (`login`)
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            restricted_resource: DEFAULT_RESTRICTED_RESOURCE.into(),
        }
    }

    /// Guard a different resource name
    pub fn with_restricted_resource(mut self, resource: impl Into<String>) -> Self {
        self.restricted_resource = resource.into();
        self
    }

    /// Name of the guarded resource
    pub fn restricted_resource(&self) -> &str {
        &self.restricted_resource
    }

    /// Check `operation` on `resource` against the current session snapshot
    pub fn evaluate(&self, resource: &str, operation: Operation) -> Decision {
        let decision = evaluate(
            &self.store.session(),
            resource,
            operation,
            &self.restricted_resource,
        );
        if !decision.allowed {
            tracing::debug!(resource, %operation, reason = %decision.reason, "Permission denied");
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use biodata_storage::MemoryStorage;
    use serde_json::json;

    use super::*;
    use crate::RawIdentity;

    fn session(json: serde_json::Value) -> Session {
        Session::from_identity(&serde_json::from_value::<RawIdentity>(json).unwrap())
    }

    #[test]
    fn it_denies_everything_when_signed_out() {
        let decision = evaluate(&Session::default(), "biodata", Operation::Read, "login");

        assert!(!decision.allowed);
        assert_eq!(decision.reason, "not signed in");
    }

    #[test]
    fn it_gates_restricted_reads_on_the_read_flag_only() {
        let admin_without_flag = session(json!({
            "userId": 1, "userType": "admin", "permission": "super_admin", "canAccessLogin": false
        }));
        let internal_with_flag = session(json!({
            "userId": 2, "userType": "internal", "canAccessLogin": true
        }));

        assert!(!evaluate(&admin_without_flag, "login", Operation::Read, "login").allowed);
        assert!(evaluate(&internal_with_flag, "login", Operation::Read, "login").allowed);
    }

    #[test]
    fn it_gates_restricted_writes_on_the_write_flag() {
        let reader = session(json!({"userId": 2, "userType": "internal", "canAccessLogin": true}));

        let decision = evaluate(&reader, "login", Operation::Write, "login");

        assert!(!decision.allowed);
        assert!(decision.reason.contains("write"));
    }

    #[test]
    fn it_allows_ordinary_resources_for_any_signed_in_user() {
        let external = session(json!({"userId": 3, "userType": "external"}));

        assert!(evaluate(&external, "biodata", Operation::Read, "login").allowed);
        assert!(evaluate(&external, "biodata", Operation::Write, "login").allowed);
    }

    #[test]
    fn it_converts_denials_into_errors() {
        let result = evaluate(&Session::default(), "biodata", Operation::Read, "login").into_result();

        assert_eq!(
            result,
            Err(AccessError::Denied {
                reason: "not signed in".into()
            })
        );
    }

    #[test]
    fn it_reads_the_shared_store() {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::default())));
        let evaluator = PermissionEvaluator::new(store.clone()).with_restricted_resource("secrets");

        store.set_session(serde_json::from_value(json!({"userId": 4, "userType": "internal"})).unwrap());

        assert!(evaluator.evaluate("login", Operation::Write).allowed);
        assert!(!evaluator.evaluate("secrets", Operation::Read).allowed);
    }
}
