//! gridshift-fetch — per-zone carbon-intensity acquisition.
//!
//! The [`Fetcher`] is the single code path through which both the
//! periodic refresh loop and ad-hoc override retriggers obtain a zone's
//! current intensity: an active override short-circuits the network and
//! is served directly; otherwise the external provider is queried with a
//! bounded timeout. Every successful call updates the [`ZoneStore`] as a
//! side effect.
//!
//! Fetch failures leave the store untouched — a stale value is preferred
//! over erasing the last known one.

pub mod error;
pub mod fetcher;
pub mod http;
pub mod provider;

pub use error::FetchError;
pub use fetcher::Fetcher;
pub use provider::{IntensityFuture, IntensityProvider, ProviderClient};
