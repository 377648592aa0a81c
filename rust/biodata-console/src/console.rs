use std::sync::Arc;

use biodata_access::{
    Decision, Navigation, Operation, PermissionEvaluator, RawIdentity, RouteGuard, RouteTable,
    Session, SessionStore,
};
use biodata_network::{ApiClient, DatabaseApi, HttpTransport, Pipeline, PermissionApi, Transport};
use biodata_panels::{GraphCache, PanelRegistry};
use biodata_storage::DurableStorage;

use crate::{ConsoleError, ConsoleSettings};

/// The console's services with their shared session.
///
/// `local` storage holds the session and the result panels, which survive
/// closing the tab; `session_storage` holds the graph cache, which does not.
pub struct Console<T> {
    settings: ConsoleSettings,
    store: Arc<SessionStore>,
    guard: RouteGuard,
    evaluator: PermissionEvaluator,
    client: Arc<ApiClient<T>>,
    database: DatabaseApi<T>,
    permissions: PermissionApi<T>,
    panels: PanelRegistry,
    graph: GraphCache,
}

impl<T> std::fmt::Debug for Console<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("store", &self.store)
            .field("panels", &self.panels)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl Console<HttpTransport> {
    /// Console talking HTTP to `settings.client.base_url`
    pub fn connect(
        settings: ConsoleSettings,
        local: Arc<dyn DurableStorage>,
        session_storage: Arc<dyn DurableStorage>,
    ) -> Result<Self, ConsoleError> {
        let transport = HttpTransport::new(&settings.client)?;
        Ok(Self::init(settings, local, session_storage, transport))
    }

    /// Console over the browser's `localStorage` and `sessionStorage`
    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    pub fn browser(settings: ConsoleSettings) -> Result<Self, ConsoleError> {
        use biodata_storage::WebStorage;

        Self::connect(
            settings,
            Arc::new(WebStorage::local()?),
            Arc::new(WebStorage::session()?),
        )
    }
}

impl<T: Transport> Console<T> {
    /// Build every service. The session is rehydrated from `local` and the
    /// panel and graph caches are bound to its owner.
    pub fn init(
        settings: ConsoleSettings,
        local: Arc<dyn DurableStorage>,
        session_storage: Arc<dyn DurableStorage>,
        transport: T,
    ) -> Self {
        let store = Arc::new(
            SessionStore::new(local.clone()).with_legacy_mirror(settings.access.mirror_legacy_key),
        );
        let scope = store.scope();

        let guard = RouteGuard::with_settings(store.clone(), RouteTable::console(), &settings.access);
        let evaluator = PermissionEvaluator::new(store.clone())
            .with_restricted_resource(settings.access.restricted_resource.clone());

        let client = Arc::new(ApiClient::new(
            transport,
            Pipeline::standard(store.clone(), &settings.client),
        ));
        let database = DatabaseApi::new(client.clone(), store.clone(), evaluator.clone());
        let permissions = PermissionApi::new(client.clone(), store.clone());

        let panels = PanelRegistry::new(local, &settings.panels, scope.clone());
        let graph = GraphCache::new(session_storage, &settings.panels, scope);

        tracing::debug!(owner = %panels.owner(), "Console initialized");

        Self {
            settings,
            store,
            guard,
            evaluator,
            client,
            database,
            permissions,
            panels,
            graph,
        }
    }

    /// Start a session for `identity` and switch the caches to its owner
    pub fn sign_in(&self, identity: RawIdentity) -> Session {
        self.store.set_session(identity);
        self.rebind();
        self.store.session()
    }

    /// End the session. The departing user's panels and graph are removed
    /// from storage and the caches fall back to the anonymous scope.
    pub fn sign_out(&self) {
        self.panels.clear_storage();
        self.graph.clear();
        self.store.clear_session();
        self.rebind();
    }

    /// Decide a navigation to `target`.
    ///
    /// The session may have been cleared by the request pipeline since the
    /// last call, so cache ownership is re-synced first.
    pub fn navigate(&self, target: &str) -> Navigation {
        self.rebind();
        self.guard.navigate(target)
    }

    /// Decide `operation` on `resource` for the current session
    pub fn check(&self, resource: &str, operation: Operation) -> Decision {
        self.evaluator.evaluate(resource, operation)
    }

    /// Point the panel and graph caches at the current session's scope
    pub fn rebind(&self) {
        let scope = self.store.scope();
        self.panels.switch_owner(scope.clone());
        self.graph.switch_scope(scope);
    }

    /// Active settings
    pub fn settings(&self) -> &ConsoleSettings {
        &self.settings
    }

    /// The shared session store
    pub fn session_store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// The current session
    pub fn session(&self) -> Session {
        self.store.session()
    }

    /// The route guard
    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// The permission evaluator
    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    /// The request client
    pub fn client(&self) -> &Arc<ApiClient<T>> {
        &self.client
    }

    /// Database endpoints
    pub fn database(&self) -> &DatabaseApi<T> {
        &self.database
    }

    /// Permission administration endpoints
    pub fn permissions(&self) -> &PermissionApi<T> {
        &self.permissions
    }

    /// Open result panels
    pub fn panels(&self) -> &PanelRegistry {
        &self.panels
    }

    /// Knowledge-graph cache
    pub fn graph(&self) -> &GraphCache {
        &self.graph
    }
}
