pub mod geocoding;
pub mod matcher;
pub mod mock;
pub mod recommendations;
pub mod subscriptions;
pub mod users;
pub mod venues;

pub use geocoding::{Geocoder, GoogleMapsGeocoder};
pub use matcher::{rank, RankingPolicy};
pub use recommendations::RecommendationService;
pub use subscriptions::SubscriptionService;
pub use users::UserService;
pub use venues::VenueService;
