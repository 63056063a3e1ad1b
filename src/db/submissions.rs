use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Submission, SubmissionStatus};

pub struct NewSubmission<'a> {
    pub facility_id: Uuid,
    pub submitter_account_id: Uuid,
    pub evidence_key: &'a str,
    pub evidence_sha256: &'a str,
    pub device_latitude: f64,
    pub device_longitude: f64,
    pub distance_meters: f64,
    pub captured_at: Option<DateTime<Utc>>,
    pub metadata: &'a serde_json::Value,
}

pub async fn create(pool: &PgPool, new: &NewSubmission<'_>) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "INSERT INTO submissions (facility_id, submitter_account_id, evidence_key,
             evidence_sha256, device_latitude, device_longitude, distance_meters,
             captured_at, metadata)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(new.facility_id)
    .bind(new.submitter_account_id)
    .bind(new.evidence_key)
    .bind(new.evidence_sha256)
    .bind(new.device_latitude)
    .bind(new.device_longitude)
    .bind(new.distance_meters)
    .bind(new.captured_at)
    .bind(new.metadata)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub struct ListParams {
    pub facility_id: Option<Uuid>,
    pub submitter_account_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list(pool: &PgPool, params: &ListParams) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT * FROM submissions
         WHERE ($1::uuid IS NULL OR facility_id = $1)
           AND ($2::uuid IS NULL OR submitter_account_id = $2)
           AND ($3::text IS NULL OR status = $3)
         ORDER BY submitted_at DESC LIMIT $4 OFFSET $5",
    )
    .bind(params.facility_id)
    .bind(params.submitter_account_id)
    .bind(params.status.map(|s| s.as_str()))
    .bind(params.limit)
    .bind(params.offset)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool, params: &ListParams) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM submissions
         WHERE ($1::uuid IS NULL OR facility_id = $1)
           AND ($2::uuid IS NULL OR submitter_account_id = $2)
           AND ($3::text IS NULL OR status = $3)",
    )
    .bind(params.facility_id)
    .bind(params.submitter_account_id)
    .bind(params.status.map(|s| s.as_str()))
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Atomically move a pending submission to a terminal status. Returns None
/// when the row is missing or was already reviewed; the status guard makes
/// concurrent reviews race for a single winner.
pub async fn transition<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    status: SubmissionStatus,
    reviewer: Uuid,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "UPDATE submissions
         SET status = $2, reviewed_at = now(), reviewed_by = $3
         WHERE id = $1 AND status = 'pending'
         RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(reviewer)
    .fetch_optional(executor)
    .await
}
