use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::UserClass;

/// Authorization metadata declared once per route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteRequirement {
    /// The route needs a signed-in session
    pub requires_auth: bool,
    /// The route is reserved for administrators
    pub admin_only: bool,
    /// When present, the session's effective role must be listed
    pub allowed_roles: Option<BTreeSet<String>>,
}

impl RouteRequirement {
    /// Open to everyone
    pub fn public() -> Self {
        Self::default()
    }

    /// Open to any signed-in session
    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    /// Additionally restrict to administrators
    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    /// Additionally restrict to the given roles
    pub fn allow_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<UserClass>,
    {
        self.allowed_roles = Some(
            roles
                .into_iter()
                .map(|role| {
                    let class: UserClass = role.into();
                    String::from(class)
                })
                .collect(),
        );
        self
    }
}

/// A navigable route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Absolute path, e.g. `/tables`
    pub path: String,
    /// Display name
    pub name: String,
    /// Authorization metadata
    pub requirement: RouteRequirement,
}

/// Declared routes plus redirect aliases. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, Route>,
    aliases: BTreeMap<String, String>,
}

impl RouteTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The console's routes
    pub fn console() -> Self {
        Self::new()
            .alias("/", "/dashboard")
            .route("/login", "Login", RouteRequirement::public())
            .route("/dashboard", "Dashboard", RouteRequirement::authenticated())
            .route("/tables", "Tables", RouteRequirement::authenticated())
            .route("/query", "Query", RouteRequirement::authenticated())
            .route(
                "/knowledge-graph",
                "KnowledgeGraph",
                RouteRequirement::authenticated(),
            )
            .route(
                "/admin/permissions",
                "Permissions",
                RouteRequirement::authenticated().admin_only(),
            )
    }

    /// Declare a route
    pub fn route(
        mut self,
        path: impl Into<String>,
        name: impl Into<String>,
        requirement: RouteRequirement,
    ) -> Self {
        let path = path.into();
        self.routes.insert(
            path.clone(),
            Route {
                path,
                name: name.into(),
                requirement,
            },
        );
        self
    }

    /// Declare a redirect alias
    pub fn alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    /// Look up a declared route by canonical path
    pub fn get(&self, path: &str) -> Option<&Route> {
        self.routes.get(path)
    }

    /// Iterate the declared routes in path order
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Canonical path and requirement for a navigation target.
    ///
    /// Query strings, fragments and trailing slashes are ignored and aliases
    /// are followed. Undeclared paths carry no requirement.
    pub fn resolve(&self, target: &str) -> (String, RouteRequirement) {
        let mut path = canonical(target);
        // Bounded so an alias cycle cannot spin forever
        for _ in 0..self.aliases.len() {
            match self.aliases.get(&path) {
                Some(next) => path = canonical(next),
                None => break,
            }
        }

        let requirement = self
            .routes
            .get(&path)
            .map(|route| route.requirement.clone())
            .unwrap_or_default();
        (path, requirement)
    }
}

fn canonical(target: &str) -> String {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    let path = target[..end].trim_end_matches('/');
    if path.is_empty() {
        "/".into()
    } else if path.starts_with('/') {
        path.into()
    } else {
        format!("/{path}")
    }
}
