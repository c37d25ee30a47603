//! gridshift-state — shared zone state for the carbon controller.
//!
//! Holds the latest known carbon intensity per zone (provider-fetched or
//! manually overridden), the override table, and the plain-text file that
//! persists the active deployment zone across restarts.
//!
//! The store is a cheaply cloneable handle; all mutations are atomic with
//! respect to concurrent readers and the lock is never held across an
//! await point.

pub mod error;
pub mod persist;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use persist::{read_active_zone, write_active_zone};
pub use store::ZoneStore;
pub use types::{IntensitySource, ZoneRecord};
