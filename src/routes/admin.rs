use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn list_audit_events(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<AuditQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let page = q.page.unwrap_or(1).max(1);
    let per_page = q.per_page.unwrap_or(50).min(200).max(1);
    let offset = (page - 1) * per_page;

    let events = db::audit::list(&state.pool, per_page, offset).await?;

    Ok(Json(serde_json::json!({
        "events": events,
        "page": page,
        "per_page": per_page,
    })))
}
