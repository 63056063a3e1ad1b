pub mod freshness;
pub mod geofence;
