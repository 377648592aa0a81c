use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use biodata_common::SharedCell;
use biodata_storage::{DurableStorage, JsonStorage, StorageError, StorageScope, discard};

use crate::{PermissionLevel, RawIdentity, UserClass, UserId};

/// Canonical storage key of the persisted identity
pub const SESSION_KEY: &str = "userInfo";

/// Storage key written by older clients
pub const LEGACY_SESSION_KEY: &str = "user";

/// Storage key recording which persisted-session schema has been migrated to
pub const SESSION_SCHEMA_KEY: &str = "userInfoSchema";

/// Current persisted-session schema version
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Who is currently using the console.
///
/// Always a complete shape: absent fields are `None` and the capability
/// flags default to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Backend user identifier
    pub user_id: Option<UserId>,
    /// Display name
    pub username: Option<String>,
    /// User class
    pub user_class: Option<UserClass>,
    /// Permission level
    pub permission: Option<PermissionLevel>,
    /// May read the restricted resource
    pub can_read_restricted: bool,
    /// May write the restricted resource
    pub can_write_restricted: bool,
}

impl Session {
    /// Build a session from a sign-in payload, normalizing the identifier
    pub fn from_identity(identity: &RawIdentity) -> Self {
        Self {
            user_id: UserId::normalize(&identity.user_id),
            username: identity.username.clone(),
            user_class: identity.user_type.clone(),
            permission: identity.permission.clone(),
            can_read_restricted: identity.can_access_login,
            can_write_restricted: identity.can_modify_login,
        }
    }

    /// True iff both the identifier and the user class are set
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some() && self.user_class.is_some()
    }

    /// True iff the class is `admin` and the permission level is elevated
    pub fn is_admin(&self) -> bool {
        self.user_class == Some(UserClass::Admin)
            && self
                .permission
                .as_ref()
                .is_some_and(PermissionLevel::is_elevated)
    }

    /// Role used for route membership checks: the user class, falling back
    /// to the permission level
    pub fn effective_role(&self) -> Option<&str> {
        self.user_class
            .as_ref()
            .map(UserClass::as_str)
            .or_else(|| self.permission.as_ref().map(PermissionLevel::as_str))
    }

    /// Storage scope owned by this session
    pub fn scope(&self) -> StorageScope {
        StorageScope::for_user(self.user_id.as_ref())
    }
}

/// Single source of truth for the signed-in identity.
///
/// The store is created once at application start and shared by reference
/// (`Arc<SessionStore>`) with the route guard and the request pipeline.
/// Memory is authoritative for the lifetime of the page: every mutation
/// updates memory first and then writes through to durable storage, and a
/// failed write is logged without rolling the memory state back.
pub struct SessionStore {
    storage: Arc<dyn DurableStorage>,
    state: SharedCell<Session>,
    mirror_legacy_key: bool,
    hydrated: AtomicBool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.read())
            .field("mirror_legacy_key", &self.mirror_legacy_key)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a store over `storage`. Nothing is read until the first
    /// access.
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            storage,
            state: SharedCell::default(),
            mirror_legacy_key: true,
            hydrated: AtomicBool::new(false),
        }
    }

    /// Whether writes also go to the legacy `user` key
    pub fn with_legacy_mirror(mut self, mirror: bool) -> Self {
        self.mirror_legacy_key = mirror;
        self
    }

    /// Accept an identity payload from sign-in.
    ///
    /// The identifier is normalized, memory is replaced, and a normalized
    /// copy of the payload is persisted.
    pub fn set_session(&self, identity: RawIdentity) {
        let session = Session::from_identity(&identity);
        tracing::debug!(
            user_id = ?session.user_id,
            user_class = ?session.user_class,
            "Session set"
        );
        self.hydrated.store(true, Ordering::SeqCst);
        self.state.replace(session);
        self.persist(&identity.normalized());
    }

    /// Current session. Storage is consulted only on the first read, and
    /// only when nothing has been set or cleared before it.
    pub fn session(&self) -> Session {
        if !self.hydrated.swap(true, Ordering::SeqCst) {
            self.rehydrate();
        }
        self.state.snapshot()
    }

    /// Reset memory to the empty session and remove both persisted keys.
    /// Calling it repeatedly is harmless. A failed removal is logged and
    /// memory stays signed out.
    pub fn clear_session(&self) {
        self.hydrated.store(true, Ordering::SeqCst);
        self.state.replace(Session::default());
        discard(self.storage.as_ref(), SESSION_KEY);
        discard(self.storage.as_ref(), LEGACY_SESSION_KEY);
    }

    /// True iff the current session has both an identifier and a class
    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    /// True iff the current session is an administrator
    pub fn is_admin(&self) -> bool {
        self.session().is_admin()
    }

    /// Stored read capability on the restricted resource
    pub fn can_read_restricted(&self) -> bool {
        self.session().can_read_restricted
    }

    /// Stored write capability on the restricted resource
    pub fn can_write_restricted(&self) -> bool {
        self.session().can_write_restricted
    }

    /// Storage scope of the current session
    pub fn scope(&self) -> StorageScope {
        self.session().scope()
    }

    fn persist(&self, identity: &RawIdentity) {
        let mut keys = vec![SESSION_KEY];
        if self.mirror_legacy_key {
            keys.push(LEGACY_SESSION_KEY);
        }
        for key in keys {
            if let Err(error) = self.storage.set_json(key, identity) {
                tracing::error!(key, %error, "Failed to persist session");
            }
        }
    }

    fn rehydrate(&self) {
        self.migrate();

        let identity = match self.storage.get_json::<RawIdentity>(SESSION_KEY) {
            Ok(Some(identity)) => identity,
            Ok(None) => return,
            Err(error @ StorageError::Decode { .. }) => {
                tracing::warn!(%error, "Discarding malformed persisted session");
                discard(self.storage.as_ref(), SESSION_KEY);
                discard(self.storage.as_ref(), LEGACY_SESSION_KEY);
                return;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to read persisted session");
                return;
            }
        };

        // Writing back normalizes records saved by older clients
        self.set_session(identity);
    }

    /// Upgrade of persisted state to [SESSION_SCHEMA_VERSION], run once as
    /// part of the first rehydration.
    ///
    /// Version 0 stored the identity under `user` only; version 1 keeps the
    /// canonical copy under `userInfo`. A legacy record is copied over when
    /// no canonical record exists.
    fn migrate(&self) {
        let version = match self.storage.get_json::<u32>(SESSION_SCHEMA_KEY) {
            Ok(version) => version.unwrap_or(0),
            Err(error) => {
                tracing::warn!(%error, "Unreadable session schema marker");
                0
            }
        };
        if version >= SESSION_SCHEMA_VERSION {
            return;
        }

        if let Err(error) = self.copy_legacy_record() {
            tracing::error!(%error, "Session schema migration failed");
        }
    }

    fn copy_legacy_record(&self) -> Result<(), StorageError> {
        if self.storage.get_item(SESSION_KEY)?.is_none() {
            if let Some(legacy) = self.storage.get_item(LEGACY_SESSION_KEY)? {
                tracing::info!("Migrating legacy session record");
                self.storage.set_item(SESSION_KEY, &legacy)?;
            }
        }
        self.storage
            .set_json(SESSION_SCHEMA_KEY, &SESSION_SCHEMA_VERSION)
    }
}
