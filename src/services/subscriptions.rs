use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{SubscriptionStatus, SubscriptionTier},
};

#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn Store>,
    premium_period: Duration,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn Store>, premium_period: Duration) -> Self {
        Self {
            store,
            premium_period,
        }
    }

    pub async fn status(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<SubscriptionStatus> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(SubscriptionStatus::for_user(&user, now))
    }

    /// Switches the user's tier
    ///
    /// Premium runs for one subscription period from `now`; free clears the expiry.
    pub async fn update(
        &self,
        user_id: &str,
        tier: &str,
        now: DateTime<Utc>,
    ) -> AppResult<SubscriptionStatus> {
        let tier: SubscriptionTier = tier
            .parse()
            .map_err(|_| AppError::InvalidInput("Invalid subscription tier".to_string()))?;

        let mut user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        user.subscription_tier = tier;
        user.subscription_expiry = match tier {
            SubscriptionTier::Premium => Some(
                now.checked_add_signed(self.premium_period)
                    .ok_or_else(|| {
                        AppError::Internal("Subscription expiry out of range".to_string())
                    })?,
            ),
            SubscriptionTier::Free => None,
        };
        user.updated_at = now;

        let user = self.store.upsert_user(user).await?;

        tracing::info!(
            user_id = %user_id,
            tier = %tier,
            expiry = ?user.subscription_expiry,
            "Subscription updated"
        );

        Ok(SubscriptionStatus::for_user(&user, now))
    }
}
