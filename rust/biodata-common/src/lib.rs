#![warn(missing_docs)]

//! Light weight helpers shared by every console crate. They carry almost no
//! dependencies so that the storage, access and network crates can all lean
//! on the same cross-target bounds and clock.

mod sync;
pub use sync::*;

pub mod time;
