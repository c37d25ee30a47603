//! Active-zone persistence.
//!
//! A single plain-text file holds the current active deployment zone,
//! overwritten on each successful migration and read once at startup.
//! Writers serialize through the trigger controller's lock.

use std::path::Path;

use tracing::debug;

use crate::error::{StateError, StateResult};

/// Read the persisted active zone, if the file exists and is non-empty.
pub fn read_active_zone(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let zone = contents.trim();
    if zone.is_empty() {
        return None;
    }
    debug!(?path, zone, "seeding active zone from persisted state");
    Some(zone.to_string())
}

/// Overwrite the persisted active zone.
pub fn write_active_zone(path: &Path, zone: &str) -> StateResult<()> {
    std::fs::write(path, format!("{zone}\n")).map_err(StateError::Write)
}
