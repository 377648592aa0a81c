use std::sync::Arc;

use biodata_access::{Session, SessionStore};
use biodata_common::ConditionalSync;
use serde_json::Value;

use crate::{ApiError, ClientSettings, FailureClass, InboundResponse, Method, OutboundRequest};

/// Outcome handed to response hooks and returned to the caller
pub type Outcome = Result<InboundResponse, ApiError>;

/// A stage of the request pipeline.
///
/// [`Interceptor::request`] may rewrite the request and runs before the
/// transport is awaited. [`Interceptor::response`] observes the outcome;
/// it can act on it (log, clear the session) but cannot change what the
/// caller receives.
pub trait Interceptor: ConditionalSync {
    /// Transform an outbound request
    fn request(&self, _request: &mut OutboundRequest) {}

    /// Observe the outcome of `request`
    fn response(&self, _request: &OutboundRequest, _outcome: &Outcome) {}
}

/// Ordered interceptors. Request hooks run in insertion order, response
/// hooks in reverse.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl Pipeline {
    /// An empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// The console's standard stages: request logging, identity injection
    /// and authorization failure handling, all over `store`
    pub fn standard(store: Arc<SessionStore>, settings: &ClientSettings) -> Self {
        Self::new()
            .with(RequestLog)
            .with(IdentityInjector::new(
                store.clone(),
                settings.identity_endpoints.clone(),
            ))
            .with(AuthFailureHandler::new(store))
    }

    /// Append a stage
    pub fn with<I: Interceptor + 'static>(mut self, stage: I) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True when there are no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every request hook
    pub fn prepare(&self, mut request: OutboundRequest) -> OutboundRequest {
        for stage in &self.stages {
            stage.request(&mut request);
        }
        request
    }

    /// Run every response hook and hand the outcome back unchanged
    pub fn complete(&self, request: &OutboundRequest, outcome: Outcome) -> Outcome {
        for stage in self.stages.iter().rev() {
            stage.response(request, &outcome);
        }
        outcome
    }
}

/// The `userId` / `userType` pair injected into identity-sensitive requests,
/// with the identifier coerced to an integer. `None` unless the session is
/// authenticated with an identifier that has an integral form.
pub fn identity_fields(session: &Session) -> Option<(Value, Value)> {
    let user_id = session.user_id.as_ref()?.coerce().as_numeric()?;
    let user_class = session.user_class.as_ref()?;
    Some((Value::from(user_id), Value::from(user_class.as_str())))
}

/// Attaches the caller's identity to requests for identity-sensitive
/// endpoints.
///
/// A request qualifies when the session is authenticated with an integral
/// identifier and its path contains one of the configured endpoint
/// fragments. Identity is merged into an object body when there is one, and
/// into the query for `GET` or bodiless requests; existing `userId` /
/// `userType` values are overwritten.
#[derive(Debug, Clone)]
pub struct IdentityInjector {
    store: Arc<SessionStore>,
    endpoints: Vec<String>,
}

impl IdentityInjector {
    /// Inject for requests whose path contains one of `endpoints`
    pub fn new(store: Arc<SessionStore>, endpoints: Vec<String>) -> Self {
        Self { store, endpoints }
    }

    fn applies_to(&self, path: &str) -> bool {
        self.endpoints
            .iter()
            .any(|endpoint| path.contains(endpoint.as_str()))
    }
}

impl Interceptor for IdentityInjector {
    fn request(&self, request: &mut OutboundRequest) {
        if !self.applies_to(&request.path) {
            return;
        }
        let Some((user_id, user_type)) = identity_fields(&self.store.session()) else {
            return;
        };

        if let Some(Value::Object(body)) = &mut request.body {
            body.insert("userId".into(), user_id.clone());
            body.insert("userType".into(), user_type.clone());
        }
        if request.method == Method::Get || request.body.is_none() {
            request.query.insert("userId".into(), user_id);
            request.query.insert("userType".into(), user_type);
        }
    }
}

/// Reacts to authorization failures.
///
/// An unauthenticated-class failure clears the session; a forbidden-class
/// failure is logged and the session left intact.
#[derive(Debug, Clone)]
pub struct AuthFailureHandler {
    store: Arc<SessionStore>,
}

impl AuthFailureHandler {
    /// Handle failures against `store`
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }
}

impl Interceptor for AuthFailureHandler {
    fn response(&self, request: &OutboundRequest, outcome: &Outcome) {
        let Err(error) = outcome else {
            return;
        };
        match error.class() {
            FailureClass::Unauthenticated => {
                tracing::warn!(path = %request.path, "Session rejected by server; signing out");
                self.store.clear_session();
            }
            FailureClass::Forbidden => {
                tracing::warn!(path = %request.path, %error, "Request forbidden");
            }
            FailureClass::Other => {}
        }
    }
}

/// Traces every request and its outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLog;

impl Interceptor for RequestLog {
    fn request(&self, request: &mut OutboundRequest) {
        tracing::debug!(method = %request.method, path = %request.path, "Sending request");
    }

    fn response(&self, request: &OutboundRequest, outcome: &Outcome) {
        match outcome {
            Ok(response) => {
                tracing::debug!(path = %request.path, status = response.status, "Request completed")
            }
            Err(error) => tracing::error!(path = %request.path, %error, "Request failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use biodata_access::RawIdentity;
    use biodata_storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn store_with(identity: Option<Value>) -> Arc<SessionStore> {
        let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::default())));
        if let Some(identity) = identity {
            store.set_session(serde_json::from_value::<RawIdentity>(identity).unwrap());
        }
        store
    }

    fn injector(store: Arc<SessionStore>) -> IdentityInjector {
        IdentityInjector::new(store, ClientSettings::default().identity_endpoints)
    }

    #[test]
    fn it_injects_identity_into_the_query_of_gets() {
        let injector = injector(store_with(Some(json!({"userId": "7", "userType": "internal"}))));
        let mut request = OutboundRequest::get("/api/database/tables").with_query("dataSource", "x");

        injector.request(&mut request);

        assert_eq!(request.query["userId"], json!(7));
        assert_eq!(request.query["userType"], json!("internal"));
        assert_eq!(request.body, None);
    }

    #[test]
    fn it_merges_identity_into_object_bodies() {
        let injector = injector(store_with(Some(json!({"userId": 3, "userType": "external"}))));
        let mut request = OutboundRequest::post(
            "/api/database/query",
            json!({"sql": "select 1", "userId": "spoofed"}),
        );

        injector.request(&mut request);

        assert_eq!(
            request.body,
            Some(json!({"sql": "select 1", "userId": 3, "userType": "external"}))
        );
        assert!(request.query.is_empty());
    }

    #[test]
    fn it_leaves_other_endpoints_alone() {
        let injector = injector(store_with(Some(json!({"userId": 3, "userType": "external"}))));
        let mut request = OutboundRequest::get("/api/database/datasources");

        injector.request(&mut request);

        assert!(request.query.is_empty());
    }

    #[test]
    fn it_injects_nothing_when_signed_out() {
        let injector = injector(store_with(None));
        let mut request = OutboundRequest::get("/api/database/tables");

        injector.request(&mut request);

        assert!(request.query.is_empty());
    }

    #[test]
    fn it_injects_nothing_for_identifiers_without_an_integral_form() {
        let injector = injector(store_with(Some(json!({"userId": "guest-1", "userType": "external"}))));
        let mut request = OutboundRequest::post("/api/database/query", json!({"sql": "select 1"}));

        injector.request(&mut request);

        assert_eq!(request.body, Some(json!({"sql": "select 1"})));
        assert!(request.query.is_empty());
    }

    #[test_log::test]
    fn it_clears_the_session_on_unauthenticated_failures() {
        let store = store_with(Some(json!({"userId": 7, "userType": "internal"})));
        let handler = AuthFailureHandler::new(store.clone());

        handler.response(
            &OutboundRequest::get("/api/database/tables"),
            &Err(ApiError::Unauthenticated {
                message: "expired".into(),
            }),
        );

        assert_eq!(store.session().user_id, None);
    }

    #[test_log::test]
    fn it_keeps_the_session_on_forbidden_failures() {
        let store = store_with(Some(json!({"userId": 7, "userType": "internal"})));
        let handler = AuthFailureHandler::new(store.clone());

        handler.response(
            &OutboundRequest::get("/api/permissions/all"),
            &Err(ApiError::Forbidden {
                reason: "admins only".into(),
            }),
        );

        assert!(store.is_authenticated());
    }

    #[test]
    fn it_returns_outcomes_unchanged() {
        let pipeline = Pipeline::standard(store_with(None), &ClientSettings::default());
        let request = OutboundRequest::get("/x");
        let outcome = Err(ApiError::Timeout);

        assert_eq!(pipeline.complete(&request, outcome), Err(ApiError::Timeout));
    }
}
