use crate::{
    error::AppResult,
    models::{Area, Recommendation, RecommendationFilters, User, Venue},
};

/// Persistent storage for recommendations, users and venues
///
/// The store is the source of truth; the cache sits in front of it in the service
/// layer. Listing operations return recommendations ordered by descending trend score.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn get_recommendation(&self, recommendation_id: &str)
        -> AppResult<Option<Recommendation>>;

    /// Fetches the given recommendations in the order of `ids`, skipping unknown IDs
    async fn get_recommendations_by_ids(&self, ids: &[String]) -> AppResult<Vec<Recommendation>>;

    async fn get_recommendations_by_venue(&self, venue_id: &str)
        -> AppResult<Vec<Recommendation>>;

    async fn list_recommendations(
        &self,
        filters: &RecommendationFilters,
    ) -> AppResult<Vec<Recommendation>>;

    async fn upsert_recommendation(&self, recommendation: Recommendation)
        -> AppResult<Recommendation>;

    /// Upserts a batch of recommendations
    ///
    /// Default implementation upserts one at a time. Stores can override for bulk writes.
    async fn upsert_recommendations(
        &self,
        recommendations: Vec<Recommendation>,
    ) -> AppResult<Vec<Recommendation>> {
        let mut stored = Vec::with_capacity(recommendations.len());
        for recommendation in recommendations {
            stored.push(self.upsert_recommendation(recommendation).await?);
        }
        Ok(stored)
    }

    /// Returns whether a recommendation was removed
    async fn delete_recommendation(&self, recommendation_id: &str) -> AppResult<bool>;

    async fn get_user(&self, user_id: &str) -> AppResult<Option<User>>;

    async fn upsert_user(&self, user: User) -> AppResult<User>;

    async fn get_venue(&self, venue_id: &str) -> AppResult<Option<Venue>>;

    /// Case-insensitive name search, ordered by name
    async fn search_venues(&self, query: &str) -> AppResult<Vec<Venue>>;

    /// Venues tagged with `category`, ordered by name
    async fn venues_by_category(&self, category: &str) -> AppResult<Vec<Venue>>;

    /// Venues inside `area`, nearest first
    async fn venues_near(&self, area: Area) -> AppResult<Vec<Venue>>;

    async fn upsert_venue(&self, venue: Venue) -> AppResult<Venue>;
}

/// Orders recommendations by descending trend score, keeping the input order on ties
pub(crate) fn sort_by_trend(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| b.trend_score.cmp(&a.trend_score));
}

/// Orders venues by distance from the area's center
pub(crate) fn sort_by_distance(venues: &mut [Venue], area: &Area) {
    venues.sort_by(|a, b| {
        let da = area.center.distance_km(&a.coordinates());
        let db = area.center.distance_km(&b.coordinates());
        da.total_cmp(&db)
    });
}
