//! gridshift-api — the controller's request-driven control surface.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/status` | Zone records, overrides, active zone, ceiling |
//! | PUT | `/api/v1/zones/{zone}/override` | Install a manual override |
//! | DELETE | `/api/v1/zones/{zone}/override` | Clear a manual override |
//!
//! Override changes are acknowledged immediately; the refresh-and-
//! evaluate they imply runs on the retrigger worker so the response is
//! never blocked on a slow selector invocation.

pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use gridshift_state::ZoneStore;
use gridshift_trigger::{Retrigger, TriggerController};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: ZoneStore,
    pub trigger: Arc<TriggerController>,
    pub retrigger: Retrigger,
    /// Configured zone list; override targets must be members.
    pub zones: Arc<Vec<String>>,
}

/// Build the API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/status", get(handlers::get_status))
        .route(
            "/zones/{zone}/override",
            axum::routing::put(handlers::put_override).delete(handlers::delete_override),
        )
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
