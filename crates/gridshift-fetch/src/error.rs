//! Error types for intensity fetching.

use thiserror::Error;

/// Failure fetching one zone's intensity. Non-fatal: the refresh loop
/// logs it and moves on to the next zone; the store keeps the last
/// known value.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid provider url: {0}")]
    BadUrl(String),

    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider request timed out after {0}s")]
    Timeout(u64),
}
