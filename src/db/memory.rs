use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use super::store::{sort_by_distance, sort_by_trend, Store};
use crate::{
    error::AppResult,
    models::{Area, Recommendation, RecommendationFilters, User, Venue},
};

/// In-process store used for development and tests
///
/// Data lives only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    recommendations: BTreeMap<String, Recommendation>,
    users: HashMap<String, User>,
    venues: BTreeMap<String, Venue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get_recommendation(
        &self,
        recommendation_id: &str,
    ) -> AppResult<Option<Recommendation>> {
        let inner = self.inner.read().await;
        Ok(inner.recommendations.get(recommendation_id).cloned())
    }

    async fn get_recommendations_by_ids(&self, ids: &[String]) -> AppResult<Vec<Recommendation>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.recommendations.get(id))
            .cloned()
            .collect())
    }

    async fn get_recommendations_by_venue(
        &self,
        venue_id: &str,
    ) -> AppResult<Vec<Recommendation>> {
        let inner = self.inner.read().await;
        let mut recommendations: Vec<Recommendation> = inner
            .recommendations
            .values()
            .filter(|r| r.venue_id.as_deref() == Some(venue_id))
            .cloned()
            .collect();
        sort_by_trend(&mut recommendations);
        Ok(recommendations)
    }

    async fn list_recommendations(
        &self,
        filters: &RecommendationFilters,
    ) -> AppResult<Vec<Recommendation>> {
        let inner = self.inner.read().await;
        let mut recommendations: Vec<Recommendation> = inner
            .recommendations
            .values()
            .filter(|r| filters.matches(r))
            .cloned()
            .collect();
        sort_by_trend(&mut recommendations);

        if let Some(limit) = filters.limit {
            recommendations.truncate(limit);
        }

        Ok(recommendations)
    }

    async fn upsert_recommendation(
        &self,
        recommendation: Recommendation,
    ) -> AppResult<Recommendation> {
        let mut inner = self.inner.write().await;
        inner.recommendations.insert(
            recommendation.recommendation_id.clone(),
            recommendation.clone(),
        );
        Ok(recommendation)
    }

    async fn delete_recommendation(&self, recommendation_id: &str) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.recommendations.remove(recommendation_id).is_some())
    }

    async fn get_user(&self, user_id: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(user_id).cloned())
    }

    async fn upsert_user(&self, user: User) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    async fn get_venue(&self, venue_id: &str) -> AppResult<Option<Venue>> {
        let inner = self.inner.read().await;
        Ok(inner.venues.get(venue_id).cloned())
    }

    async fn search_venues(&self, query: &str) -> AppResult<Vec<Venue>> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;
        let mut venues: Vec<Venue> = inner
            .venues
            .values()
            .filter(|v| v.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(venues)
    }

    async fn venues_by_category(&self, category: &str) -> AppResult<Vec<Venue>> {
        let inner = self.inner.read().await;
        let mut venues: Vec<Venue> = inner
            .venues
            .values()
            .filter(|v| v.categories.iter().any(|c| c == category))
            .cloned()
            .collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(venues)
    }

    async fn venues_near(&self, area: Area) -> AppResult<Vec<Venue>> {
        let inner = self.inner.read().await;
        let mut venues: Vec<Venue> = inner
            .venues
            .values()
            .filter(|v| area.contains(&v.coordinates()))
            .cloned()
            .collect();
        sort_by_distance(&mut venues, &area);
        Ok(venues)
    }

    async fn upsert_venue(&self, venue: Venue) -> AppResult<Venue> {
        let mut inner = self.inner.write().await;
        inner.venues.insert(venue.venue_id.clone(), venue.clone());
        Ok(venue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recommendation::fixtures::recommendation;
    use crate::models::Coordinates;
    use chrono::Utc;

    fn venue(id: &str, name: &str, categories: &[&str], latitude: f64, longitude: f64) -> Venue {
        Venue {
            venue_id: id.to_string(),
            name: name.to_string(),
            address: "100 Main St, San Francisco, CA".to_string(),
            latitude,
            longitude,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_trend_and_limits() {
        let store = MemoryStore::new();
        for (id, score) in [("a", 71), ("b", 99), ("c", 85)] {
            store
                .upsert_recommendation(recommendation(id, &["chill"], score))
                .await
                .unwrap();
        }

        let filters = RecommendationFilters {
            limit: Some(2),
            ..Default::default()
        };
        let listed = store.list_recommendations(&filters).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.recommendation_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_get_by_ids_keeps_requested_order() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            store
                .upsert_recommendation(recommendation(id, &[], 80))
                .await
                .unwrap();
        }

        let ids = vec!["c".to_string(), "missing".to_string(), "a".to_string()];
        let found = store.get_recommendations_by_ids(&ids).await.unwrap();
        let found: Vec<&str> = found.iter().map(|r| r.recommendation_id.as_str()).collect();
        assert_eq!(found, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_recommendations_by_venue() {
        let store = MemoryStore::new();
        let mut first = recommendation("a", &[], 70);
        first.venue_id = Some("venue-1".to_string());
        let mut second = recommendation("b", &[], 90);
        second.venue_id = Some("venue-1".to_string());
        store.upsert_recommendation(first).await.unwrap();
        store.upsert_recommendation(second).await.unwrap();
        store
            .upsert_recommendation(recommendation("c", &[], 99))
            .await
            .unwrap();

        let found = store.get_recommendations_by_venue("venue-1").await.unwrap();
        let found: Vec<&str> = found.iter().map(|r| r.recommendation_id.as_str()).collect();
        assert_eq!(found, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_delete_recommendation() {
        let store = MemoryStore::new();
        store
            .upsert_recommendation(recommendation("a", &[], 80))
            .await
            .unwrap();

        assert!(store.delete_recommendation("a").await.unwrap());
        assert!(!store.delete_recommendation("a").await.unwrap());
        assert_eq!(store.get_recommendation("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_venue_search_and_category() {
        let store = MemoryStore::new();
        store
            .upsert_venue(venue("1", "Skyline Lounge", &["bar"], 37.77, -122.42))
            .await
            .unwrap();
        store
            .upsert_venue(venue("2", "Blue Note Jazz Club", &["music", "bar"], 37.78, -122.41))
            .await
            .unwrap();

        let found = store.search_venues("jazz").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].venue_id, "2");

        let bars = store.venues_by_category("bar").await.unwrap();
        let names: Vec<&str> = bars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Blue Note Jazz Club", "Skyline Lounge"]);
    }

    #[tokio::test]
    async fn test_venues_near_orders_by_distance() {
        let store = MemoryStore::new();
        store
            .upsert_venue(venue("far", "Oakland Spot", &[], 37.8044, -122.2712))
            .await
            .unwrap();
        store
            .upsert_venue(venue("mid", "Mission Spot", &[], 37.76, -122.42))
            .await
            .unwrap();
        store
            .upsert_venue(venue("near", "Market Spot", &[], 37.775, -122.419))
            .await
            .unwrap();

        let area = Area {
            center: Coordinates::new(37.7749, -122.4194),
            radius_km: 5.0,
        };
        let found = store.venues_near(area).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|v| v.venue_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
    }
}
