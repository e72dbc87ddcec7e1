use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default search radius in kilometers
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// A WGS84 latitude/longitude pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
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

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in kilometers (haversine)
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// A circular search area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub center: Coordinates,
    pub radius_km: f64,
}

impl Area {
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.center.distance_km(point) <= self.radius_km
    }

    /// Latitude/longitude box enclosing the area, as `(min, max)` corners
    ///
    /// Used to pre-filter rows in SQL before the exact distance check. Widens to the
    /// full longitude range near the poles or when the box would cross the antimeridian.
    pub fn bounding_box(&self) -> (Coordinates, Coordinates) {
        let d_lat = (self.radius_km / EARTH_RADIUS_KM).to_degrees();
        let min_lat = (self.center.latitude - d_lat).max(-90.0);
        let max_lat = (self.center.latitude + d_lat).min(90.0);

        let cos_lat = self.center.latitude.to_radians().cos();
        let (min_lon, max_lon) = if cos_lat < 1e-6 {
            (-180.0, 180.0)
        } else {
            let d_lon = d_lat / cos_lat;
            let min_lon = self.center.longitude - d_lon;
            let max_lon = self.center.longitude + d_lon;
            if min_lon < -180.0 || max_lon > 180.0 {
                (-180.0, 180.0)
            } else {
                (min_lon, max_lon)
            }
        };

        (
            Coordinates::new(min_lat, min_lon),
            Coordinates::new(max_lat, max_lon),
        )
    }
}
