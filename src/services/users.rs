use chrono::Utc;
use std::sync::Arc;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{normalize_tags, Recommendation, User, UserUpdate, MAX_PREFERENCES},
    services::recommendations::RecommendationService,
};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    recommendations: RecommendationService,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, recommendations: RecommendationService) -> Self {
        Self {
            store,
            recommendations,
        }
    }

    pub async fn get(&self, user_id: &str) -> AppResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Returns the user's record, creating one with defaults on first access
    pub async fn get_or_create(&self, user_id: &str) -> AppResult<User> {
        if let Some(user) = self.store.get_user(user_id).await? {
            return Ok(user);
        }

        tracing::info!(user_id = %user_id, "Creating user record");
        self.store.upsert_user(User::new(user_id)).await
    }

    pub async fn create_or_update(&self, user_id: &str, update: UserUpdate) -> AppResult<User> {
        let mut user = self
            .store
            .get_user(user_id)
            .await?
            .unwrap_or_else(|| User::new(user_id));

        update.apply(&mut user);
        user.preferences = validate_preferences(std::mem::take(&mut user.preferences))?;

        self.save(user).await
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        preferences: Vec<String>,
    ) -> AppResult<User> {
        let mut user = self.get(user_id).await?;
        user.preferences = validate_preferences(preferences)?;

        tracing::info!(
            user_id = %user_id,
            preferences = ?user.preferences,
            "Updated vibe preferences"
        );

        self.save(user).await
    }

    pub async fn complete_onboarding(&self, user_id: &str) -> AppResult<User> {
        let mut user = self.get(user_id).await?;
        user.onboarding_complete = true;
        self.save(user).await
    }

    /// Saves a recommendation for the user; saving twice is a no-op
    pub async fn save_location(&self, user_id: &str, recommendation_id: &str) -> AppResult<User> {
        self.recommendations.get_by_id(recommendation_id).await?;

        let mut user = self.get(user_id).await?;
        if !user.save_location(recommendation_id) {
            return Ok(user);
        }

        tracing::info!(
            user_id = %user_id,
            recommendation_id = %recommendation_id,
            "Saved location"
        );

        self.save(user).await
    }

    pub async fn remove_saved_location(
        &self,
        user_id: &str,
        recommendation_id: &str,
    ) -> AppResult<User> {
        let mut user = self.get(user_id).await?;
        user.remove_saved_location(recommendation_id);
        self.save(user).await
    }

    /// The recommendations the user has saved, in save order
    pub async fn saved_recommendations(&self, user_id: &str) -> AppResult<Vec<Recommendation>> {
        let user = self.get(user_id).await?;
        if user.saved_locations.is_empty() {
            return Ok(Vec::new());
        }
        self.recommendations.by_ids(&user.saved_locations).await
    }

    async fn save(&self, mut user: User) -> AppResult<User> {
        user.updated_at = Utc::now();
        self.store.upsert_user(user).await
    }
}

fn validate_preferences(preferences: Vec<String>) -> AppResult<Vec<String>> {
    let preferences = normalize_tags(preferences);
    if preferences.len() > MAX_PREFERENCES {
        return Err(AppError::InvalidInput(format!(
            "At most {} vibe preferences are allowed",
            MAX_PREFERENCES
        )));
    }
    Ok(preferences)
}
