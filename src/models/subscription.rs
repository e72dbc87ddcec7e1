use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SubscriptionTier, User};

const PREMIUM_FEATURES: &[&str] = &[
    "Advanced filtering",
    "Personalized vibe matching",
    "Unlimited saved locations",
    "Ad-free experience",
    "Priority recommendations",
];

const FREE_FEATURES: &[&str] = &[
    "Basic filtering",
    "Limited saved locations",
    "Standard recommendations",
];

/// Subscription state reported to the client
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionStatus {
    pub tier: SubscriptionTier,
    pub expiry: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub features: Vec<String>,
}

impl SubscriptionStatus {
    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        let is_active = user.is_premium_active(now);
        let features = if is_active {
            PREMIUM_FEATURES
        } else {
            FREE_FEATURES
        };

        Self {
            tier: user.subscription_tier,
            expiry: user.subscription_expiry,
            is_active,
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionRequest {
    pub tier: String,
}
