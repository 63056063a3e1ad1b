use std::net::IpAddr;

use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::Submission;
use crate::state::SharedState;
use crate::verify::freshness::{self, CaptureTimestamp};
use crate::verify::geofence::{self, Coordinates};

use super::metadata;
use super::parser::SubmissionUpload;

/// Run one evidence upload through the full intake: rate limit, facility
/// checks, geofence, freshness, evidence persistence, then the pending row.
/// Nothing is written unless every gate passes.
pub async fn run(
    state: &SharedState,
    submitter: &AuthUser,
    headers: &HeaderMap,
    peer_addr: Option<IpAddr>,
    upload: SubmissionUpload,
) -> Result<Submission, AppError> {
    let config = &state.config;

    if let Err(retry_after) = state.submission_limiter.check(
        submitter.account_id,
        config.submission_rate_limit,
        config.submission_rate_window_secs,
    ) {
        return Err(AppError::RateLimited(format!(
            "Submission limit reached. Retry after {retry_after}s"
        )));
    }

    let facility = db::facilities::find_by_id(&state.pool, upload.facility_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    if !facility.is_verified {
        return Err(AppError::Validation(
            "Facility is not verified for the composting program".to_string(),
        ));
    }

    let device = Coordinates::new(upload.device_latitude, upload.device_longitude);
    if !device.is_valid_wgs84() {
        return Err(AppError::Validation(format!(
            "Device coordinates out of range: {}, {}",
            device.latitude, device.longitude
        )));
    }

    let fence = geofence::check(device, facility.coordinates(), config.geofence_radius_meters);
    let Some(distance_meters) = fence.distance_meters else {
        return Err(AppError::Validation(
            "Facility has no registered coordinates; location cannot be verified".to_string(),
        ));
    };
    if !fence.within_fence {
        return Err(AppError::Validation(format!(
            "Device is {:.1} m from the facility, outside the {} m geofence",
            distance_meters, config.geofence_radius_meters
        )));
    }

    let capture = match upload.captured_at.as_deref() {
        Some(raw) => Some(CaptureTimestamp::parse(raw).ok_or_else(|| {
            AppError::Validation(format!("Unparseable capture timestamp: {raw}"))
        })?),
        None => None,
    };

    let freshness = freshness::check(
        capture,
        Utc::now(),
        config.capture_time_offset,
        config.max_evidence_age_hours,
        config.capture_time_policy,
    );

    if !freshness.is_fresh {
        return Err(match freshness.age_hours {
            Some(age) => AppError::Validation(format!(
                "Evidence is {:.1} h old, beyond the {} h freshness window",
                age, config.max_evidence_age_hours
            )),
            None => AppError::Validation(
                "Evidence carries no capture timestamp".to_string(),
            ),
        });
    }

    if capture.is_none() {
        tracing::warn!(
            facility_id = %facility.id,
            "Accepting evidence without a capture timestamp"
        );
    }

    let stored = state
        .evidence
        .store(&upload.evidence_content_type, &upload.evidence)
        .await?;

    let mut meta = metadata::extract(headers, peer_addr, &config.trusted_proxies);
    if let Some(obj) = meta.as_object_mut() {
        obj.insert("evidence_filename".into(), json!(upload.evidence_filename));
        obj.insert("evidence_size_bytes".into(), json!(stored.size_bytes));
        obj.insert("capture_time_raw".into(), json!(upload.captured_at));
        obj.insert(
            "capture_time_naive".into(),
            json!(capture.map(|c| c.is_naive())),
        );
        obj.insert("age_hours".into(), json!(freshness.age_hours));
    }

    let new = db::submissions::NewSubmission {
        facility_id: facility.id,
        submitter_account_id: submitter.account_id,
        evidence_key: &stored.key,
        evidence_sha256: &stored.sha256,
        device_latitude: device.latitude,
        device_longitude: device.longitude,
        distance_meters,
        captured_at: capture.map(|c| c.resolve(config.capture_time_offset)),
        metadata: &meta,
    };
    let submission = db::submissions::create(&state.pool, &new).await?;

    audit::log_event(
        &state.pool,
        Some(submitter.account_id),
        "submission.created",
        "submission",
        Some(submission.id),
        Some(json!({
            "facility_id": facility.id,
            "distance_meters": distance_meters,
            "age_hours": freshness.age_hours,
        })),
    )
    .await;

    Ok(submission)
}
