//! REST API handlers for status and manual overrides.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use gridshift_state::IntensitySource;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Status ─────────────────────────────────────────────────────

/// One zone's row in the status view.
#[derive(serde::Serialize)]
pub struct ZoneStatus {
    pub zone: String,
    pub value: f64,
    pub source: IntensitySource,
    pub observed_at: u64,
    pub is_override: bool,
    pub is_active: bool,
}

/// Full controller status.
#[derive(serde::Serialize)]
pub struct StatusView {
    pub active_zone: String,
    pub max_intensity: f64,
    pub zones: Vec<ZoneStatus>,
}

/// GET /api/v1/status
///
/// Reflects the last successfully known value per zone — a failed
/// refresh never erases or re-dates a record.
pub async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    let active_zone = state.trigger.active_zone().await;
    let overrides = state.store.overrides();

    let zones = state
        .store
        .snapshot()
        .into_iter()
        .map(|(zone, rec)| ZoneStatus {
            is_override: overrides.contains_key(&zone),
            is_active: zone == active_zone,
            zone,
            value: rec.value,
            source: rec.source,
            observed_at: rec.observed_at,
        })
        .collect();

    ApiResponse::ok(StatusView {
        active_zone,
        max_intensity: state.trigger.max_intensity(),
        zones,
    })
}

// ── Overrides ──────────────────────────────────────────────────

/// Override request body.
#[derive(serde::Deserialize)]
pub struct OverrideRequest {
    pub value: f64,
}

/// PUT /api/v1/zones/{zone}/override
pub async fn put_override(
    State(state): State<ApiState>,
    Path(zone): Path<String>,
    Json(req): Json<OverrideRequest>,
) -> impl IntoResponse {
    if !state.zones.contains(&zone) {
        return error_response(&format!("unknown zone: {zone}"), StatusCode::BAD_REQUEST)
            .into_response();
    }
    if !req.value.is_finite() || req.value < 0.0 {
        return error_response("value must be a non-negative number", StatusCode::BAD_REQUEST)
            .into_response();
    }

    state.store.set_override(&zone, req.value);
    // Stamp the record immediately so status reflects the override;
    // the worker re-evaluates the trigger condition off the request path.
    state
        .store
        .set(&zone, req.value, IntensitySource::Override, epoch_secs());
    state.retrigger.request(&zone);

    info!(%zone, value = req.value, "manual override installed");
    ApiResponse::ok(serde_json::json!({ "zone": zone, "value": req.value })).into_response()
}

/// DELETE /api/v1/zones/{zone}/override
///
/// Idempotent: clearing an absent override changes nothing.
pub async fn delete_override(
    State(state): State<ApiState>,
    Path(zone): Path<String>,
) -> impl IntoResponse {
    if !state.zones.contains(&zone) {
        return error_response(&format!("unknown zone: {zone}"), StatusCode::BAD_REQUEST)
            .into_response();
    }

    let existed = state.store.clear_override(&zone);
    if existed {
        // Restore the provider-backed value and re-check the threshold,
        // off the request path.
        state.retrigger.request(&zone);
        info!(%zone, "manual override cleared");
    }

    ApiResponse::ok(serde_json::json!({ "zone": zone, "cleared": existed })).into_response()
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
