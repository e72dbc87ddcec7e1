use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    cached,
    db::{Cache, CacheKey, CacheTtl, Store},
    error::{AppError, AppResult},
    models::{
        normalize_tags, Coordinates, Recommendation, RecommendationFilters, RecommendationInput,
        RecommendationPatch, User, MAX_TREND_SCORE,
    },
    services::{
        matcher::{rank, RankingPolicy},
        mock,
    },
};

/// Most vibe filters a free user may apply at once
pub const FREE_MAX_VIBE_FILTERS: usize = 2;

/// Upper bound on a single mock generation request
pub const MAX_MOCK_COUNT: usize = 100;

/// Reads, writes and personalizes recommendations
///
/// Single-item and per-venue reads go through the cache; every write invalidates the
/// affected keys.
#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn Store>,
    cache: Cache,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn Store>, cache: Cache) -> Self {
        Self { store, cache }
    }

    pub async fn get_by_id(&self, recommendation_id: &str) -> AppResult<Recommendation> {
        let store = self.store.clone();
        let id = recommendation_id.to_string();

        cached!(
            self.cache,
            CacheKey::Recommendation(id.clone()),
            CacheTtl::Medium,
            async move {
                store
                    .get_recommendation(&id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Recommendation not found".to_string()))
            }
        )
    }

    /// Recommendations attached to a venue, highest trend score first
    pub async fn by_venue(&self, venue_id: &str) -> AppResult<Vec<Recommendation>> {
        let store = self.store.clone();
        let id = venue_id.to_string();

        cached!(
            self.cache,
            CacheKey::VenueRecommendations(id.clone()),
            CacheTtl::Medium,
            async move { store.get_recommendations_by_venue(&id).await }
        )
    }

    pub async fn list(&self, filters: &RecommendationFilters) -> AppResult<Vec<Recommendation>> {
        self.store.list_recommendations(filters).await
    }

    pub async fn by_ids(&self, ids: &[String]) -> AppResult<Vec<Recommendation>> {
        self.store.get_recommendations_by_ids(ids).await
    }

    /// Personalizes the filtered candidate list for `user`
    ///
    /// Premium users get every candidate ranked by blended score. Free users get the
    /// candidates sharing a tag with their preferences; when none do, the unfiltered
    /// candidate list is returned instead. Free users are also limited to
    /// [`FREE_MAX_VIBE_FILTERS`] vibe filters and cannot filter by trend score.
    pub async fn personalized(
        &self,
        user: &User,
        mut filters: RecommendationFilters,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Recommendation>> {
        let policy = RankingPolicy::for_premium(user.is_premium_active(now));

        if policy == RankingPolicy::Free {
            if filters.vibe_tags.len() > FREE_MAX_VIBE_FILTERS {
                return Err(AppError::InvalidInput(format!(
                    "Upgrade to premium to select more than {} vibe filters",
                    FREE_MAX_VIBE_FILTERS
                )));
            }
            filters.min_trend_score = None;
        }

        // Rank the full candidate set, then cut
        let limit = filters.limit.take();
        let candidates = self.store.list_recommendations(&filters).await?;
        let candidate_count = candidates.len();

        let mut ranked = match policy {
            RankingPolicy::Free => {
                let filtered = rank(policy, &user.preferences, candidates.clone());
                if filtered.is_empty() {
                    tracing::debug!(
                        user_id = %user.user_id,
                        candidates = candidate_count,
                        "No preference matches, falling back to unfiltered list"
                    );
                    candidates
                } else {
                    filtered
                }
            }
            RankingPolicy::Premium => rank(policy, &user.preferences, candidates),
        };

        if let Some(limit) = limit {
            ranked.truncate(limit);
        }

        tracing::info!(
            user_id = %user.user_id,
            policy = ?policy,
            candidates = candidate_count,
            returned = ranked.len(),
            "Personalized recommendations"
        );

        Ok(ranked)
    }

    /// Creates or replaces a recommendation
    ///
    /// Fills in a generated ID, a trend score in `70..100` and the current time when
    /// the input omits them.
    pub async fn upsert(&self, input: RecommendationInput) -> AppResult<Recommendation> {
        let recommendation = build_recommendation(input, Utc::now())?;
        let previous_venue = self
            .store
            .get_recommendation(&recommendation.recommendation_id)
            .await?
            .and_then(|r| r.venue_id);

        let stored = self.store.upsert_recommendation(recommendation).await?;
        self.invalidate(&stored.recommendation_id, stored.venue_id.as_deref());
        if let Some(venue_id) = previous_venue.as_deref() {
            self.cache
                .delete(&CacheKey::VenueRecommendations(venue_id.to_string()).to_string());
        }

        tracing::info!(
            recommendation_id = %stored.recommendation_id,
            trend_score = stored.trend_score,
            "Recommendation saved"
        );

        Ok(stored)
    }

    pub async fn update(
        &self,
        recommendation_id: &str,
        patch: RecommendationPatch,
    ) -> AppResult<Recommendation> {
        let existing = self.get_by_id(recommendation_id).await?;
        self.upsert(patch.apply(existing)).await
    }

    pub async fn delete(&self, recommendation_id: &str) -> AppResult<()> {
        let existing = self
            .store
            .get_recommendation(recommendation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Recommendation not found".to_string()))?;

        self.store.delete_recommendation(recommendation_id).await?;
        self.invalidate(recommendation_id, existing.venue_id.as_deref());

        tracing::info!(recommendation_id = %recommendation_id, "Recommendation deleted");

        Ok(())
    }

    /// Generates and stores `count` mock recommendations around `center`
    pub async fn generate_mock(
        &self,
        count: usize,
        center: Coordinates,
    ) -> AppResult<Vec<Recommendation>> {
        if count == 0 || count > MAX_MOCK_COUNT {
            return Err(AppError::InvalidInput(format!(
                "count must be between 1 and {}",
                MAX_MOCK_COUNT
            )));
        }
        if !center.is_valid() {
            return Err(AppError::InvalidInput("Invalid coordinates".to_string()));
        }

        let generated = mock::generate_recommendations(count, center);
        let stored = self.store.upsert_recommendations(generated).await?;
        for recommendation in &stored {
            self.invalidate(
                &recommendation.recommendation_id,
                recommendation.venue_id.as_deref(),
            );
        }

        tracing::info!(count = stored.len(), "Generated mock recommendations");

        Ok(stored)
    }

    fn invalidate(&self, recommendation_id: &str, venue_id: Option<&str>) {
        self.cache
            .delete(&CacheKey::Recommendation(recommendation_id.to_string()).to_string());
        if let Some(venue_id) = venue_id {
            self.cache
                .delete(&CacheKey::VenueRecommendations(venue_id.to_string()).to_string());
        }
    }
}

/// Validates the input and fills in defaults
fn build_recommendation(
    input: RecommendationInput,
    now: DateTime<Utc>,
) -> AppResult<Recommendation> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title is required".to_string()));
    }

    if !Coordinates::new(input.latitude, input.longitude).is_valid() {
        return Err(AppError::InvalidInput("Invalid coordinates".to_string()));
    }

    let trend_score = match input.trend_score {
        Some(score) if (0..=MAX_TREND_SCORE).contains(&score) => score,
        Some(score) => {
            return Err(AppError::InvalidInput(format!(
                "trend_score must be between 0 and {}, got {}",
                MAX_TREND_SCORE, score
            )))
        }
        None => mock::default_trend_score(),
    };

    let recommendation_id = input
        .recommendation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(Recommendation {
        recommendation_id,
        title,
        description: input.description,
        venue_id: input.venue_id,
        venue_name: input.venue_name,
        location: input.location,
        latitude: input.latitude,
        longitude: input.longitude,
        vibe_tags: normalize_tags(input.vibe_tags),
        trend_score,
        timestamp: input.timestamp.unwrap_or(now),
        image_url: input.image_url,
        video_url: input.video_url,
        social_media_url: input.social_media_url,
        match_score: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, TtlPresets};
    use crate::models::recommendation::fixtures::recommendation;
    use crate::models::SubscriptionTier;
    use chrono::Duration;

    fn service() -> (RecommendationService, Arc<MemoryStore>, Cache) {
        let store = Arc::new(MemoryStore::new());
        let cache = Cache::new(TtlPresets::default());
        let service = RecommendationService::new(store.clone(), cache.clone());
        (service, store, cache)
    }

    fn input(title: &str) -> RecommendationInput {
        RecommendationInput {
            title: title.to_string(),
            latitude: 37.7749,
            longitude: -122.4194,
            vibe_tags: vec!["Chill".to_string()],
            ..Default::default()
        }
    }

    fn user_with(preferences: &[&str], premium: bool) -> User {
        let mut user = User::new("0xabc");
        user.preferences = preferences.iter().map(|p| p.to_string()).collect();
        if premium {
            user.subscription_tier = SubscriptionTier::Premium;
            user.subscription_expiry = Some(Utc::now() + Duration::days(30));
        }
        user
    }

    async fn seed(store: &MemoryStore) {
        for (id, tags, score) in [
            ("a", vec!["loud"], 99),
            ("b", vec!["chill", "cozy"], 75),
            ("c", vec!["chill"], 90),
        ] {
            store
                .upsert_recommendation(recommendation(id, &tags, score))
                .await
                .unwrap();
        }
    }

    fn ids(recommendations: &[Recommendation]) -> Vec<&str> {
        recommendations
            .iter()
            .map(|r| r.recommendation_id.as_str())
            .collect()
    }

    #[test]
    fn test_build_fills_defaults() {
        let now = Utc::now();
        let built = build_recommendation(input("Rooftop Party"), now).unwrap();

        assert!(!built.recommendation_id.is_empty());
        assert!((70..100).contains(&built.trend_score));
        assert_eq!(built.timestamp, now);
        assert_eq!(built.vibe_tags, vec!["chill"]);
    }

    #[test]
    fn test_build_rejects_out_of_range_trend_score() {
        let mut bad = input("Rooftop Party");
        bad.trend_score = Some(101);
        let err = build_recommendation(bad, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("trend_score"));
    }

    #[test]
    fn test_build_rejects_blank_title_and_bad_coordinates() {
        assert!(build_recommendation(input("  "), Utc::now()).is_err());

        let mut bad = input("Rooftop Party");
        bad.latitude = 120.0;
        assert!(build_recommendation(bad, Utc::now()).is_err());
    }

    #[tokio::test]
    async fn test_get_by_id_reads_through_cache() {
        let (service, store, cache) = service();
        store
            .upsert_recommendation(recommendation("a", &["chill"], 80))
            .await
            .unwrap();

        let first = service.get_by_id("a").await.unwrap();
        assert_eq!(cache.len(), 1);

        // Served from cache even after the row disappears from the store
        store.delete_recommendation("a").await.unwrap();
        let second = service.get_by_id("a").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found_and_not_cached() {
        let (service, _store, cache) = service();
        let err = service.get_by_id("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_invalidates_cached_entries() {
        let (service, _store, _cache) = service();
        let mut created = input("Rooftop Party");
        created.recommendation_id = Some("a".to_string());
        created.venue_id = Some("venue-1".to_string());
        created.trend_score = Some(80);
        service.upsert(created).await.unwrap();

        assert_eq!(service.get_by_id("a").await.unwrap().trend_score, 80);
        assert_eq!(service.by_venue("venue-1").await.unwrap().len(), 1);

        let updated = service
            .update(
                "a",
                RecommendationPatch {
                    trend_score: Some(95),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.trend_score, 95);

        assert_eq!(service.get_by_id("a").await.unwrap().trend_score, 95);
        assert_eq!(service.by_venue("venue-1").await.unwrap()[0].trend_score, 95);
    }

    #[tokio::test]
    async fn test_moving_venue_invalidates_old_venue_list() {
        let (service, _store, _cache) = service();
        let mut created = input("Rooftop Party");
        created.recommendation_id = Some("a".to_string());
        created.venue_id = Some("venue-1".to_string());
        service.upsert(created).await.unwrap();
        assert_eq!(service.by_venue("venue-1").await.unwrap().len(), 1);

        service
            .update(
                "a",
                RecommendationPatch {
                    venue_id: Some(Some("venue-2".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.by_venue("venue-1").await.unwrap().is_empty());
        assert_eq!(service.by_venue("venue-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_invalidates_and_reports_missing() {
        let (service, store, _cache) = service();
        store
            .upsert_recommendation(recommendation("a", &[], 80))
            .await
            .unwrap();
        service.get_by_id("a").await.unwrap();

        service.delete("a").await.unwrap();
        assert!(matches!(
            service.get_by_id("a").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete("a").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_personalized_premium_ranks_everything() {
        let (service, store, _cache) = service();
        seed(&store).await;

        let ranked = service
            .personalized(
                &user_with(&["chill"], true),
                RecommendationFilters::default(),
                Utc::now(),
            )
            .await
            .unwrap();

        // c: 0.7 + 0.27 = 0.97, b: 0.7 + 0.225 = 0.925, a: 0.297
        assert_eq!(ids(&ranked), vec!["c", "b", "a"]);
        assert!(ranked.iter().all(|r| r.match_score.is_some()));
    }

    #[tokio::test]
    async fn test_personalized_free_filters_in_trend_order() {
        let (service, store, _cache) = service();
        seed(&store).await;

        let ranked = service
            .personalized(
                &user_with(&["chill"], false),
                RecommendationFilters::default(),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(ids(&ranked), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_personalized_free_falls_back_when_nothing_matches() {
        let (service, store, _cache) = service();
        seed(&store).await;

        let ranked = service
            .personalized(
                &user_with(&["romantic"], false),
                RecommendationFilters::default(),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(ids(&ranked), vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_personalized_expired_premium_is_free() {
        let (service, store, _cache) = service();
        seed(&store).await;

        let mut user = user_with(&["chill"], true);
        user.subscription_expiry = Some(Utc::now() - Duration::days(1));

        let ranked = service
            .personalized(&user, RecommendationFilters::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(ids(&ranked), vec!["c", "b"]);
        assert!(ranked.iter().all(|r| r.match_score.is_none()));
    }

    #[tokio::test]
    async fn test_personalized_free_filter_limits() {
        let (service, store, _cache) = service();
        seed(&store).await;

        let filters = RecommendationFilters {
            vibe_tags: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };
        let err = service
            .personalized(&user_with(&["chill"], false), filters, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        // Trend filtering is ignored for free users
        let filters = RecommendationFilters {
            min_trend_score: Some(95),
            ..Default::default()
        };
        let ranked = service
            .personalized(&user_with(&["chill"], false), filters, Utc::now())
            .await
            .unwrap();
        assert_eq!(ids(&ranked), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_personalized_limit_applies_after_ranking() {
        let (service, store, _cache) = service();
        seed(&store).await;

        let filters = RecommendationFilters {
            limit: Some(1),
            ..Default::default()
        };
        let ranked = service
            .personalized(&user_with(&["cozy"], true), filters, Utc::now())
            .await
            .unwrap();

        // "a" has the highest trend score but "b" is the only cozy match
        assert_eq!(ids(&ranked), vec!["b"]);
    }

    #[tokio::test]
    async fn test_generate_mock_stores_recommendations() {
        let (service, store, _cache) = service();
        let generated = service.generate_mock(5, mock::DEFAULT_CENTER).await.unwrap();
        assert_eq!(generated.len(), 5);

        let listed = store
            .list_recommendations(&RecommendationFilters::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 5);

        assert!(service.generate_mock(0, mock::DEFAULT_CENTER).await.is_err());
        assert!(service
            .generate_mock(MAX_MOCK_COUNT + 1, mock::DEFAULT_CENTER)
            .await
            .is_err());
    }
}
