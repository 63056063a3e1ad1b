use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{Submission, SubmissionStatus};
use crate::review::ReviewDecision;
use crate::state::SharedState;
use crate::submission::{parser, pipeline};

#[derive(Deserialize)]
pub struct ListQuery {
    pub facility_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let content_type = headers.get("content-type").and_then(|v| v.to_str().ok());
    if !content_type.is_some_and(|ct| ct.contains("multipart/form-data")) {
        return Err(AppError::BadRequest(
            "Expected multipart/form-data".to_string(),
        ));
    }

    let upload = parser::parse_upload(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    let submission = pipeline::run(&state, &auth, &headers, Some(addr.ip()), upload).await?;

    Ok((StatusCode::CREATED, Json(submission)))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = match q.status.as_deref() {
        Some(raw) => Some(SubmissionStatus::parse(raw).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown status filter: {raw}"))
        })?),
        None => None,
    };

    let page = q.page.unwrap_or(1).max(1);
    let per_page = q.per_page.unwrap_or(20).min(100).max(1);
    let offset = (page - 1) * per_page;

    // Non-admins only ever see their own submissions.
    let submitter = if auth.is_admin() {
        None
    } else {
        Some(auth.account_id)
    };

    let params = db::submissions::ListParams {
        facility_id: q.facility_id,
        submitter_account_id: submitter,
        status,
        limit: per_page,
        offset,
    };

    let submissions = db::submissions::list(&state.pool, &params).await?;
    let total = db::submissions::count(&state.pool, &params).await?;

    Ok(Json(serde_json::json!({
        "submissions": submissions,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": (total as f64 / per_page as f64).ceil() as i64,
    })))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Submission>, AppError> {
    let submission = db::submissions::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

    if !auth.is_admin() && submission.submitter_account_id != auth.account_id {
        // Facility owners may also inspect submissions against their site.
        let owns_facility = db::facilities::find_by_id(&state.pool, submission.facility_id)
            .await?
            .is_some_and(|f| f.owner_account_id == auth.account_id);
        if !owns_facility {
            return Err(AppError::NotFound("Submission not found".to_string()));
        }
    }

    Ok(Json(submission))
}

pub async fn review(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let outcome = crate::review::transition_submission(&state, &auth, id, req.decision).await?;

    Ok(Json(serde_json::json!({
        "submission": outcome.submission,
        "tax_amount": outcome.tax_amount,
    })))
}
