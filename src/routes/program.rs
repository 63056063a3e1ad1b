use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::state::SharedState;

/// Program parameters devices need before submitting. Public: these are
/// policy constants, not secrets.
pub async fn parameters(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(json!({
        "geofence_radius_meters": state.config.geofence_radius_meters,
        "max_evidence_age_hours": state.config.max_evidence_age_hours,
        "discount_rate": state.config.discount_rate,
        "max_evidence_bytes": state.config.max_body_size,
        "location_timeout_secs": state.config.location_timeout_secs,
    }))
}
