use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Conventional upper bound on declared vibe preferences
pub const MAX_PREFERENCES: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
}

impl Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionTier::Free => write!(f, "free"),
            SubscriptionTier::Premium => write!(f, "premium"),
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(format!("Invalid subscription tier: {}", other)),
        }
    }
}

/// A user, identified by wallet address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub user_id: String,
    /// Declared vibe tags, treated as a set
    pub preferences: Vec<String>,
    /// Saved recommendation IDs, in save order, without duplicates
    pub saved_locations: Vec<String>,
    pub subscription_tier: SubscriptionTier,
    pub subscription_expiry: Option<DateTime<Utc>>,
    pub onboarding_complete: bool,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a user record with default settings
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            preferences: Vec::new(),
            saved_locations: Vec::new(),
            subscription_tier: SubscriptionTier::Free,
            subscription_expiry: None,
            onboarding_complete: false,
            updated_at: Utc::now(),
        }
    }

    /// Premium only counts while the expiry lies in the future
    pub fn is_premium_active(&self, now: DateTime<Utc>) -> bool {
        self.subscription_tier == SubscriptionTier::Premium
            && self.subscription_expiry.is_some_and(|expiry| expiry > now)
    }

    /// Adds a saved location, returns false if it was already saved
    pub fn save_location(&mut self, recommendation_id: &str) -> bool {
        if self.saved_locations.iter().any(|id| id == recommendation_id) {
            return false;
        }
        self.saved_locations.push(recommendation_id.to_string());
        true
    }

    pub fn remove_saved_location(&mut self, recommendation_id: &str) {
        self.saved_locations.retain(|id| id != recommendation_id);
    }
}

/// The subset of a user visible to other users
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublicUser {
    pub user_id: String,
    pub preferences: Vec<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            preferences: user.preferences,
        }
    }
}

/// Body of a create-or-update request; absent fields keep their current value
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserUpdate {
    pub preferences: Option<Vec<String>>,
    pub saved_locations: Option<Vec<String>>,
    pub onboarding_complete: Option<bool>,
}

impl UserUpdate {
    pub fn apply(self, user: &mut User) {
        if let Some(preferences) = self.preferences {
            user.preferences = preferences;
        }
        if let Some(saved_locations) = self.saved_locations {
            user.saved_locations = Vec::new();
            for id in saved_locations {
                user.save_location(&id);
            }
        }
        if let Some(onboarding_complete) = self.onboarding_complete {
            user.onboarding_complete = onboarding_complete;
        }
    }
}
