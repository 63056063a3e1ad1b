pub mod admin;
pub mod facilities;
pub mod program;
pub mod submissions;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Facilities
        .route(
            "/api/v1/facilities",
            get(facilities::list).post(facilities::create),
        )
        .route("/api/v1/facilities/{id}", get(facilities::get))
        .route("/api/v1/facilities/{id}/verify", post(facilities::verify))
        .route(
            "/api/v1/facilities/{id}/location",
            put(facilities::update_location),
        )
        .route("/api/v1/facilities/{id}/tax", put(facilities::update_tax))
        .route(
            "/api/v1/facilities/{id}/geofence",
            get(facilities::geofence_preflight),
        )
        // Submissions
        .route(
            "/api/v1/submissions",
            get(submissions::list).post(submissions::create),
        )
        .route("/api/v1/submissions/{id}", get(submissions::get))
        .route(
            "/api/v1/submissions/{id}/review",
            post(submissions::review),
        )
        // Program parameters
        .route("/api/v1/program", get(program::parameters))
        // Admin
        .route("/api/v1/admin/audit-events", get(admin::list_audit_events))
}
