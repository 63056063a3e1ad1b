use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::verify::geofence::Coordinates;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Facility {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_verified: bool,
    pub tax_amount: f64,
    pub owner_account_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Facility {
    /// Registered coordinates; absent until an admin has pinned the site.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}
