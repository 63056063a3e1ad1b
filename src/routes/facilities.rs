use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::Facility;
use crate::state::SharedState;
use crate::verify::geofence::{self, Coordinates, GeofenceCheck};

#[derive(Deserialize)]
pub struct CreateFacility {
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tax_amount: f64,
    pub owner_account_id: Uuid,
}

#[derive(Deserialize)]
pub struct UpdateLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct UpdateTax {
    pub tax_amount: f64,
}

#[derive(Deserialize)]
pub struct PreflightParams {
    pub latitude: f64,
    pub longitude: f64,
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateFacility>,
) -> Result<Json<Facility>, AppError> {
    auth.require_admin()?;

    if req.name.trim().is_empty() || req.address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name and address are required".to_string(),
        ));
    }

    if !req.tax_amount.is_finite() || req.tax_amount < 0.0 {
        return Err(AppError::BadRequest(
            "tax_amount must be non-negative".to_string(),
        ));
    }

    let coords = match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "latitude and longitude must be provided together".to_string(),
            ));
        }
    };
    if let Some(c) = coords {
        if !c.is_valid_wgs84() {
            return Err(AppError::BadRequest(format!(
                "Coordinates out of range: {}, {}",
                c.latitude, c.longitude
            )));
        }
    }

    let facility = db::facilities::create(
        &state.pool,
        req.name.trim(),
        req.address.trim(),
        req.latitude,
        req.longitude,
        req.tax_amount,
        req.owner_account_id,
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(auth.account_id),
        "facility.created",
        "facility",
        Some(facility.id),
        None,
    )
    .await;

    Ok(Json(facility))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Facility>>, AppError> {
    let facilities = if auth.is_admin() {
        db::facilities::list_all(&state.pool).await?
    } else {
        db::facilities::list_by_owner(&state.pool, auth.account_id).await?
    };
    Ok(Json(facilities))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Facility>, AppError> {
    let facility = db::facilities::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    if !auth.is_admin() && facility.owner_account_id != auth.account_id {
        return Err(AppError::NotFound("Facility not found".to_string()));
    }

    Ok(Json(facility))
}

pub async fn verify(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Facility>, AppError> {
    auth.require_admin()?;

    let facility = db::facilities::set_verified(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    audit::log_event(
        &state.pool,
        Some(auth.account_id),
        "facility.verified",
        "facility",
        Some(facility.id),
        None,
    )
    .await;

    Ok(Json(facility))
}

pub async fn update_location(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLocation>,
) -> Result<Json<Facility>, AppError> {
    auth.require_admin()?;

    let coords = Coordinates::new(req.latitude, req.longitude);
    if !coords.is_valid_wgs84() {
        return Err(AppError::BadRequest(format!(
            "Coordinates out of range: {}, {}",
            coords.latitude, coords.longitude
        )));
    }

    let facility = db::facilities::set_location(&state.pool, id, req.latitude, req.longitude)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    audit::log_event(
        &state.pool,
        Some(auth.account_id),
        "facility.location_updated",
        "facility",
        Some(facility.id),
        Some(serde_json::json!({
            "latitude": req.latitude,
            "longitude": req.longitude,
        })),
    )
    .await;

    Ok(Json(facility))
}

pub async fn update_tax(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTax>,
) -> Result<Json<Facility>, AppError> {
    auth.require_admin()?;

    if !req.tax_amount.is_finite() || req.tax_amount < 0.0 {
        return Err(AppError::BadRequest(
            "tax_amount must be non-negative".to_string(),
        ));
    }

    let facility = db::facilities::set_tax_amount(&state.pool, id, req.tax_amount)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    audit::log_event(
        &state.pool,
        Some(auth.account_id),
        "facility.tax_updated",
        "facility",
        Some(facility.id),
        Some(serde_json::json!({ "tax_amount": req.tax_amount })),
    )
    .await;

    Ok(Json(facility))
}

/// Dry-run geofence check so devices can tell the user whether a submission
/// would pass before they photograph anything. No state is written.
pub async fn geofence_preflight(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PreflightParams>,
) -> Result<Json<GeofenceCheck>, AppError> {
    let facility = db::facilities::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Facility not found".to_string()))?;

    let device = Coordinates::new(params.latitude, params.longitude);
    if !device.is_valid_wgs84() {
        return Err(AppError::BadRequest(format!(
            "Coordinates out of range: {}, {}",
            device.latitude, device.longitude
        )));
    }

    let check = geofence::check(
        device,
        facility.coordinates(),
        state.config.geofence_radius_meters,
    );
    Ok(Json(check))
}
