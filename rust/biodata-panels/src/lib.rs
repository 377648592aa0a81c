//! Client-side caches that outlive a page load but not a day.
//!
//! [`PanelRegistry`] holds the ordered set of open search-result panels and
//! [`GraphCache`] the last loaded knowledge graph. Both persist through a
//! [`DurableStorage`](biodata_storage::DurableStorage), stamp what they write
//! with the current time, discard anything older than the configured
//! [`PanelSettings::max_age_ms`] on load, and are bound to a
//! [`StorageScope`](biodata_storage::StorageScope) so one user's panels and
//! graph are never shown to the next.

mod settings;
pub use settings::*;

mod registry;
pub use registry::*;

mod graph;
pub use graph::*;
