pub mod config;
pub mod error;
pub mod state;
pub mod auth;
pub mod db;
pub mod models;
pub mod middleware;
pub mod routes;
pub mod submission;
pub mod review;
pub mod verify;
pub mod ledger;
pub mod location;
pub mod storage;
pub mod rate_limit;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::rate_limit::SubmissionRateLimiter;
use crate::state::{AppState, SharedState};
use crate::storage::EvidenceStore;

pub fn build_app(pool: PgPool, config: Config, evidence: EvidenceStore) -> Router {
    let max_body_size = config.max_body_size;
    let evidence_root = evidence.root().to_path_buf();

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        evidence,
        submission_limiter: SubmissionRateLimiter::new(),
    });

    Router::new()
        .merge(routes::api_routes())
        // Evidence keys are unguessable UUIDs; objects themselves are public.
        .nest_service("/evidence", ServeDir::new(evidence_root))
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
