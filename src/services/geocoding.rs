//! Address geocoding
//!
//! Venue creation resolves missing coordinates through a [`Geocoder`]. The only
//! implementation talks to the Google Maps Geocoding API; callers cache results.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A resolved address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a free-text address to coordinates
    async fn geocode(&self, address: &str) -> AppResult<GeocodeResult>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct GoogleMapsGeocoder {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl GoogleMapsGeocoder {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }

    /// Converts the API payload into a [`GeocodeResult`], using the first match
    fn convert_response(&self, response: GoogleGeocodeResponse) -> AppResult<GeocodeResult> {
        if response.status != "OK" {
            return Err(AppError::ExternalApi(format!(
                "Google Maps API error: {}",
                response.status
            )));
        }

        let result = response.results.into_iter().next().ok_or_else(|| {
            AppError::ExternalApi("Google Maps API returned no results".to_string())
        })?;

        Ok(GeocodeResult {
            latitude: result.geometry.location.lat,
            longitude: result.geometry.location.lng,
            formatted_address: result.formatted_address,
        })
    }
}

#[async_trait::async_trait]
impl Geocoder for GoogleMapsGeocoder {
    async fn geocode(&self, address: &str) -> AppResult<GeocodeResult> {
        let url = format!("{}/maps/api/geocode/json", self.api_url);

        tracing::debug!(address = %address, "Geocoding address");

        let response = self
            .http_client
            .get(&url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "Geocoding request failed");
            return Err(AppError::ExternalApi(format!(
                "Google Maps API returned status {}",
                status
            )));
        }

        let payload: GoogleGeocodeResponse = response.json().await?;
        let result = self.convert_response(payload)?;

        tracing::info!(
            address = %address,
            latitude = result.latitude,
            longitude = result.longitude,
            "Geocoded address"
        );

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "google_maps"
    }
}

// ============================================================================
// Google Maps Geocoding API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleGeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeocodeResult {
    formatted_address: String,
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}
