//! Error types for the zone state crate.

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while persisting or reading controller state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read active zone file: {0}")]
    Read(std::io::Error),

    #[error("failed to write active zone file: {0}")]
    Write(std::io::Error),
}
