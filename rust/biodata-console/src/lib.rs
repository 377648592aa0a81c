//! The database console's client-side services, wired together.
//!
//! [`Console`] is created once at application start. It owns the session
//! store and hands it by reference to the route guard, the permission
//! evaluator and the request pipeline, and keeps the result panels and the
//! graph cache bound to whoever is signed in.
//!
//! ```rust
//! use std::sync::Arc;
//! use biodata_access::{Operation, RawIdentity};
//! use biodata_console::{Console, ConsoleSettings};
//! use biodata_network::MockTransport;
//! use biodata_storage::MemoryStorage;
//!
//! let console = Console::init(
//!     ConsoleSettings::default(),
//!     Arc::new(MemoryStorage::default()),
//!     Arc::new(MemoryStorage::default()),
//!     MockTransport::default(),
//! );
//! assert!(!console.navigate("/tables").proceeds());
//!
//! console.sign_in(RawIdentity::from_json(r#"{"userId":7,"userType":"internal"}"#)?);
//! assert!(console.navigate("/tables").proceeds());
//! assert!(!console.check("login", Operation::Read).allowed);
//! # Ok::<(), serde_json::Error>(())
//! ```

mod error;
pub use error::*;

mod settings;
pub use settings::*;

mod console;
pub use console::*;
