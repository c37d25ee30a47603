//! gridshift-select — pick the greenest deployment zone.
//!
//! Queries a Prometheus-compatible backend for the latest per-zone
//! carbon intensity, ranks the candidates with a stable linear minimum
//! scan, applies the acceptability ceiling, and maps the winner to a
//! cloud region. The crate also ships the `gridshift-select` binary the
//! trigger controller invokes as an isolated subprocess: JSON report on
//! stdout, per-zone table on stderr, exit 0 iff a zone was picked.
//!
//! Selection is pure with respect to controller state — it neither
//! reads nor writes the active zone or cooldown clock.

pub mod picker;
pub mod query;
pub mod report;

pub use picker::{pick_greenest, select, RegionMap, RegionMapError, SelectParams};
pub use query::{PromClient, QueryError};
pub use report::{BestPick, SelectionReport, ZoneReading};
