use std::sync::Arc;

use crate::{
    config::Config,
    db::{Cache, Store},
    services::{
        Geocoder, RecommendationService, SubscriptionService, UserService, VenueService,
    },
};

/// Shared application state
///
/// All services share one store and one cache.
#[derive(Clone)]
pub struct AppState {
    pub recommendations: RecommendationService,
    pub venues: VenueService,
    pub users: UserService,
    pub subscriptions: SubscriptionService,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn Store>, geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        let cache = Cache::new(config.ttl_presets());
        let recommendations = RecommendationService::new(store.clone(), cache.clone());

        Self {
            venues: VenueService::new(store.clone(), cache, geocoder, recommendations.clone()),
            users: UserService::new(store.clone(), recommendations.clone()),
            subscriptions: SubscriptionService::new(
                store,
                chrono::Duration::days(config.premium_period_days),
            ),
            recommendations,
        }
    }
}
