use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{geo::Coordinates, Recommendation};

/// A physical place recommendations can point at
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Venue {
    pub venue_id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Venue {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Body of a venue creation request
#[derive(Debug, Clone, Deserialize, Default)]
pub struct VenueInput {
    #[serde(default)]
    pub venue_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// A venue together with its recommendations
#[derive(Debug, Clone, Serialize)]
pub struct VenueDetails {
    #[serde(flatten)]
    pub venue: Venue,
    /// Absent when the recommendations could not be loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<Recommendation>>,
}
