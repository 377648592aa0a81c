//! Cross-target bound compatibility traits and shared state.
//!
//! The console runs on a single-threaded browser event loop, but the same
//! services are also exercised natively (tests, command line tools) where an
//! `Arc` may cross threads. The traits below are empty on
//! `wasm32-unknown-unknown` and collapse to `Send` / `Send + Sync` elsewhere.

#[allow(missing_docs)]
#[cfg(not(target_arch = "wasm32"))]
pub trait ConditionalSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<S> ConditionalSend for S where S: Send {}

#[allow(missing_docs)]
#[cfg(not(target_arch = "wasm32"))]
pub trait ConditionalSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<S> ConditionalSync for S where S: Send + Sync {}

#[allow(missing_docs)]
#[cfg(target_arch = "wasm32")]
pub trait ConditionalSend {}

#[cfg(target_arch = "wasm32")]
impl<S> ConditionalSend for S {}

#[allow(missing_docs)]
#[cfg(target_arch = "wasm32")]
pub trait ConditionalSync {}

#[cfg(target_arch = "wasm32")]
impl<S> ConditionalSync for S {}

/// Interior-mutable holder for a store's in-memory state.
///
/// Every mutation goes through [`SharedCell::update`], which holds the write
/// lock for the whole closure, so readers never observe a half-applied
/// change. Guards must not be held across an `.await`.
///
/// ```
/// use biodata_common::SharedCell;
///
/// let cell = SharedCell::new(vec![1]);
/// cell.update(|items| items.push(2));
///
/// assert_eq!(cell.snapshot(), vec![1, 2]);
/// ```
#[derive(Debug, Default)]
pub struct SharedCell<T>(parking_lot::RwLock<T>);

impl<T> SharedCell<T> {
    /// Creates a new cell holding `value`
    pub fn new(value: T) -> Self {
        Self(parking_lot::RwLock::new(value))
    }

    /// Borrows the value for reading
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// Applies `change` atomically and returns whatever it returns
    pub fn update<R>(&self, change: impl FnOnce(&mut T) -> R) -> R {
        let mut value = self.0.write();
        change(&mut value)
    }

    /// Replaces the value, returning the previous one
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.0.write(), value)
    }
}

impl<T: Clone> SharedCell<T> {
    /// Returns a copy of the current value
    pub fn snapshot(&self) -> T {
        self.0.read().clone()
    }
}
