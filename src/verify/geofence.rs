use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (spherical approximation, no ellipsoid
/// correction).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid_wgs84(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Outcome of a geofence check. `distance_meters` is absent when the
/// facility has no registered coordinates.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeofenceCheck {
    pub distance_meters: Option<f64>,
    pub within_fence: bool,
}

/// Great-circle distance between two points using the haversine formula.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Check whether the device is within `radius_meters` of the facility.
///
/// A facility without registered coordinates fails closed: the check
/// reports outside-fence rather than skipping, so unregistered locations
/// can never receive evidence.
pub fn check(
    device: Coordinates,
    facility: Option<Coordinates>,
    radius_meters: f64,
) -> GeofenceCheck {
    let Some(facility) = facility else {
        return GeofenceCheck {
            distance_meters: None,
            within_fence: false,
        };
    };

    let distance = haversine_meters(device, facility);
    GeofenceCheck {
        distance_meters: Some(distance),
        // A point exactly on the fence counts as inside.
        within_fence: distance <= radius_meters,
    }
}
