//! gridshift-trigger — threshold-driven zone migration.
//!
//! The [`TriggerController`] owns the cooldown clock and the active-zone
//! pointer. When a fresh intensity reading for the active zone exceeds
//! the configured ceiling, and the cooldown window has elapsed, it runs
//! the region selector as a subprocess, interprets the structured
//! report, and on a genuine zone change persists the new active zone.
//!
//! Two producers drive it: the periodic [`RefreshLoop`] and the
//! [`Retrigger`] dispatcher that serializes override-induced
//! re-evaluations behind a bounded queue.

pub mod controller;
pub mod invoke;
pub mod monitor;
pub mod retrigger;

pub use controller::{TriggerConfig, TriggerController};
pub use invoke::{InvokeError, InvokeFuture, SelectSubprocess, SelectorInvoker};
pub use monitor::RefreshLoop;
pub use retrigger::Retrigger;
