#![warn(missing_docs)]

//! Durable client-side storage for the console.
//!
//! Browser storage (`localStorage` / `sessionStorage`) is a synchronous,
//! string-keyed, string-valued map. [DurableStorage] captures exactly that
//! contract so the session store and the panel registry can be exercised
//! against an in-memory map, a directory on disk, or the real browser APIs:
//!
//! ```rust
//! use biodata_storage::{DurableStorage, JsonStorage, MemoryStorage};
//!
//! let storage = MemoryStorage::default();
//! storage.set_json("answer", &42u32)?;
//!
//! assert_eq!(storage.get_json::<u32>("answer")?, Some(42));
//! # Ok::<(), biodata_storage::StorageError>(())
//! ```
//!
//! On top of the raw map, [Expiry] wraps values in a [Stamped] envelope so
//! stale entries are discarded wholesale on load, and [StorageScope] derives
//! the per-user key suffix that keeps one user's cached state away from the
//! next.

mod error;
pub use error::*;

mod storage;
pub use storage::*;

mod expiry;
pub use expiry::*;

mod scope;
pub use scope::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
