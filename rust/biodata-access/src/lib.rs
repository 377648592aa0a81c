//! Client-side access control for the database console.
//!
//! This crate mirrors the backend's authorization decisions so the console
//! can hide what a user may not do and route them away from pages they may
//! not see. It is a UX and defense-in-depth layer only: identity fields are
//! not signed, and the backend re-validates every request.
//!
//! # Pieces
//!
//! | Type | Role |
//! |------|------|
//! | [`RawIdentity`] | Identity payload as delivered by sign-in, normalized once on ingestion |
//! | [`SessionStore`] | Single source of truth for who is signed in, persisted across reloads |
//! | [`PermissionEvaluator`] | `(resource, operation) → Decision` over the current session |
//! | [`RouteTable`] / [`RouteRequirement`] | Static per-route authorization metadata |
//! | [`RouteGuard`] | Decides proceed/redirect before every navigation |
//!
//! ```rust
//! use std::sync::Arc;
//! use biodata_access::{Navigation, Operation, PermissionEvaluator, RawIdentity, RouteGuard, SessionStore};
//! use biodata_storage::MemoryStorage;
//!
//! let store = Arc::new(SessionStore::new(Arc::new(MemoryStorage::default())));
//! store.set_session(RawIdentity::from_json(r#"{"userId":"7","userType":"internal"}"#)?);
//!
//! let evaluator = PermissionEvaluator::new(store.clone());
//! assert!(!evaluator.evaluate("login", Operation::Read).allowed);
//! assert!(evaluator.evaluate("biodata", Operation::Write).allowed);
//!
//! let guard = RouteGuard::new(store);
//! assert!(matches!(guard.navigate("/admin/permissions"), Navigation::Redirect { .. }));
//! # Ok::<(), serde_json::Error>(())
//! ```

mod error;
pub use error::*;

mod settings;
pub use settings::*;

mod identity;
pub use identity::*;

mod session;
pub use session::*;

mod permission;
pub use permission::*;

mod route;
pub use route::*;

mod guard;
pub use guard::*;
