pub mod geo;
pub mod recommendation;
pub mod subscription;
pub mod user;
pub mod venue;

pub use geo::{Area, Coordinates, DEFAULT_RADIUS_KM};
pub use recommendation::{
    normalize_tags, Recommendation, RecommendationFilters, RecommendationInput,
    RecommendationPatch, MAX_TREND_SCORE,
};
pub use subscription::{SubscriptionRequest, SubscriptionStatus};
pub use user::{PublicUser, SubscriptionTier, User, UserUpdate, MAX_PREFERENCES};
pub use venue::{Venue, VenueDetails, VenueInput};
