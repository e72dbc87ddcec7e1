use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    cached,
    db::{Cache, CacheKey, CacheTtl, Store},
    error::{AppError, AppResult},
    models::{Area, Coordinates, Venue, VenueDetails, VenueInput},
    services::{
        geocoding::{GeocodeResult, Geocoder},
        recommendations::RecommendationService,
    },
};

#[derive(Clone)]
pub struct VenueService {
    store: Arc<dyn Store>,
    cache: Cache,
    geocoder: Option<Arc<dyn Geocoder>>,
    recommendations: RecommendationService,
}

impl VenueService {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Cache,
        geocoder: Option<Arc<dyn Geocoder>>,
        recommendations: RecommendationService,
    ) -> Self {
        Self {
            store,
            cache,
            geocoder,
            recommendations,
        }
    }

    pub async fn get(&self, venue_id: &str) -> AppResult<Venue> {
        let store = self.store.clone();
        let id = venue_id.to_string();

        cached!(
            self.cache,
            CacheKey::Venue(id.clone()),
            CacheTtl::Medium,
            async move {
                store
                    .get_venue(&id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Venue not found".to_string()))
            }
        )
    }

    /// A venue with its recommendations
    ///
    /// Failing to load the recommendations is not fatal; the venue is returned alone.
    pub async fn details(&self, venue_id: &str) -> AppResult<VenueDetails> {
        let venue = self.get(venue_id).await?;

        let recommendations = match self.recommendations.by_venue(venue_id).await {
            Ok(recommendations) => Some(recommendations),
            Err(e) => {
                tracing::warn!(venue_id = %venue_id, error = %e, "Failed to load venue recommendations");
                None
            }
        };

        Ok(VenueDetails {
            venue,
            recommendations,
        })
    }

    pub async fn search(&self, query: &str) -> AppResult<Vec<Venue>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.store.search_venues(query).await
    }

    pub async fn by_category(&self, category: &str) -> AppResult<Vec<Venue>> {
        let category = category.trim().to_lowercase();
        if category.is_empty() {
            return Ok(Vec::new());
        }
        self.store.venues_by_category(&category).await
    }

    pub async fn nearby(&self, area: Area) -> AppResult<Vec<Venue>> {
        if !area.center.is_valid() || area.radius_km <= 0.0 {
            return Err(AppError::InvalidInput("Invalid search area".to_string()));
        }
        self.store.venues_near(area).await
    }

    /// Creates or updates a venue, geocoding the address when coordinates are missing
    pub async fn create(&self, input: VenueInput) -> AppResult<Venue> {
        let name = input.name.trim().to_string();
        let address = input.address.trim().to_string();
        if name.is_empty() || address.is_empty() {
            return Err(AppError::InvalidInput("Missing required fields".to_string()));
        }

        let coordinates = match (input.latitude, input.longitude) {
            (Some(latitude), Some(longitude)) => Coordinates::new(latitude, longitude),
            _ => {
                let result = self
                    .geocode(&format!("{}, {}", name, address))
                    .await
                    .map_err(|e| {
                        tracing::warn!(error = %e, "Geocoding failed");
                        AppError::InvalidInput("Failed to geocode address".to_string())
                    })?;
                Coordinates::new(result.latitude, result.longitude)
            }
        };

        if !coordinates.is_valid() {
            return Err(AppError::InvalidInput("Invalid coordinates".to_string()));
        }

        let venue_id = input
            .venue_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let now = Utc::now();
        let created_at = self
            .store
            .get_venue(&venue_id)
            .await?
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let mut categories: Vec<String> = Vec::new();
        for category in input.categories {
            let category = category.trim().to_lowercase();
            if !category.is_empty() && !categories.contains(&category) {
                categories.push(category);
            }
        }

        let venue = self
            .store
            .upsert_venue(Venue {
                venue_id,
                name,
                address,
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
                categories,
                created_at,
                updated_at: now,
            })
            .await?;

        self.cache
            .delete(&CacheKey::Venue(venue.venue_id.clone()).to_string());
        self.cache
            .delete(&CacheKey::VenueRecommendations(venue.venue_id.clone()).to_string());

        tracing::info!(venue_id = %venue.venue_id, name = %venue.name, "Venue saved");

        Ok(venue)
    }

    async fn geocode(&self, address: &str) -> AppResult<GeocodeResult> {
        let geocoder = self
            .geocoder
            .clone()
            .ok_or_else(|| AppError::ExternalApi("No geocoder configured".to_string()))?;
        let query = address.to_string();

        cached!(
            self.cache,
            CacheKey::Geocode(query.clone()),
            CacheTtl::Long,
            async move {
                tracing::debug!(provider = geocoder.name(), "Calling geocoder");
                geocoder.geocode(&query).await
            }
        )
    }
}
