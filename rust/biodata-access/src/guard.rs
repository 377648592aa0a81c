use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use crate::{AccessSettings, RouteRequirement, RouteTable, Session, SessionStore};

/// The rule that rejected a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The route needs a session and there is none
    NotAuthenticated,
    /// The route is admin-only and the session is not an administrator
    AdminOnly,
    /// The route lists allowed roles and the session's role is not one
    RoleNotAllowed {
        /// Effective role of the session, if it had one
        role: Option<String>,
    },
}

impl Display for Denial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::NotAuthenticated => f.write_str("requiresAuth"),
            Denial::AdminOnly => f.write_str("adminOnly"),
            Denial::RoleNotAllowed { role: Some(role) } => write!(f, "allowedRoles ({role})"),
            Denial::RoleNotAllowed { role: None } => f.write_str("allowedRoles"),
        }
    }
}

/// What the router should do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Continue to the (canonical) target path
    Proceed {
        /// Path being entered
        path: String,
    },
    /// Go somewhere else instead
    Redirect {
        /// Path that was refused
        from: String,
        /// Path to go to
        to: String,
        /// Rule that refused it
        denial: Denial,
    },
}

impl Navigation {
    /// True for [`Navigation::Proceed`]
    pub fn proceeds(&self) -> bool {
        matches!(self, Navigation::Proceed { .. })
    }

    /// The rule behind a redirect
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Navigation::Proceed { .. } => None,
            Navigation::Redirect { denial, .. } => Some(denial),
        }
    }
}

/// Check `requirement` against `session`.
///
/// Rules are applied in a fixed order and the first failure wins:
/// authentication, then `adminOnly`, then `allowedRoles`. A route that
/// declares both admin-only and a role list therefore always reports the
/// admin-only failure for a non-admin.
pub fn authorize(requirement: &RouteRequirement, session: &Session) -> Result<(), Denial> {
    if !requirement.requires_auth {
        return Ok(());
    }

    if !session.is_authenticated() {
        return Err(Denial::NotAuthenticated);
    }

    if requirement.admin_only && !session.is_admin() {
        return Err(Denial::AdminOnly);
    }

    if let Some(allowed) = &requirement.allowed_roles {
        let role = session.effective_role();
        if !role.is_some_and(|role| allowed.contains(role)) {
            return Err(Denial::RoleNotAllowed {
                role: role.map(str::to_owned),
            });
        }
    }

    Ok(())
}

/// Runs before every navigation and decides proceed or redirect.
///
/// The guard only reads the [`SessionStore`]; it never clears or changes
/// it. Every refusal is logged with the attempted path and the failing rule.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    store: Arc<SessionStore>,
    table: RouteTable,
    sign_in_route: String,
    landing_route: String,
}

impl RouteGuard {
    /// Guard over the console's route table with default redirect targets
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self::with_settings(store, RouteTable::console(), &AccessSettings::default())
    }

    /// Guard over `table`, redirecting to the routes named in `settings`
    pub fn with_settings(
        store: Arc<SessionStore>,
        table: RouteTable,
        settings: &AccessSettings,
    ) -> Self {
        Self {
            store,
            table,
            sign_in_route: settings.sign_in_route.clone(),
            landing_route: settings.landing_route.clone(),
        }
    }

    /// The route table being enforced
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Decide a navigation to `target`
    pub fn navigate(&self, target: &str) -> Navigation {
        let (path, requirement) = self.table.resolve(target);
        self.check(path, &requirement)
    }

    /// Decide entering `path` given its declared `requirement`
    pub fn check(&self, path: impl Into<String>, requirement: &RouteRequirement) -> Navigation {
        let path = path.into();
        if !requirement.requires_auth {
            return Navigation::Proceed { path };
        }

        match authorize(requirement, &self.store.session()) {
            Ok(()) => Navigation::Proceed { path },
            Err(denial) => {
                let to = match denial {
                    Denial::NotAuthenticated => self.sign_in_route.clone(),
                    Denial::AdminOnly | Denial::RoleNotAllowed { .. } => {
                        self.landing_route.clone()
                    }
                };
                tracing::warn!(path = %path, rule = %denial, redirect = %to, "Navigation denied");
                Navigation::Redirect {
                    from: path,
                    to,
                    denial,
                }
            }
        }
    }
}
