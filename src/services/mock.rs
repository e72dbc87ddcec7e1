use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, thread_rng, Rng};
use uuid::Uuid;

use crate::models::{Coordinates, Recommendation};

/// Downtown San Francisco, the default center for generated data
pub const DEFAULT_CENTER: Coordinates = Coordinates {
    latitude: 37.7749,
    longitude: -122.4194,
};

const VIBE_TAGS: &[&str] = &[
    "chill",
    "lively",
    "upscale",
    "casual",
    "romantic",
    "family-friendly",
    "trendy",
    "nostalgic",
    "artsy",
    "energetic",
    "intimate",
    "social",
    "quiet",
    "loud",
    "outdoor",
    "cozy",
];

const VENUES: &[&str] = &[
    "Blue Note Jazz Club",
    "The Rustic Spoon",
    "Skyline Lounge",
    "Harbor Brewing Co.",
    "Green Garden Cafe",
    "The Velvet Room",
    "Sunset Beach Bar",
    "Mountain View Restaurant",
    "Urban Eats",
    "The Cozy Corner",
    "Riverside Grill",
    "The Art Gallery Cafe",
];

const ACTIVITIES: &[&str] = &[
    "Live Jazz Night",
    "Craft Cocktail Tasting",
    "Rooftop Party",
    "Local Beer Festival",
    "Farm-to-Table Dinner",
    "Poetry Slam",
    "Beach Volleyball Tournament",
    "Sunset Yoga Session",
    "Food Truck Rally",
    "Vintage Movie Night",
    "Riverside Picnic",
    "Art Exhibition Opening",
];

/// Spread of generated coordinates around the center, in degrees (about 5 km)
const SPREAD_DEGREES: f64 = 0.1;

/// Trend score assigned to ingested items that arrive without one: `70..100`
pub fn default_trend_score() -> i32 {
    thread_rng().gen_range(70..100)
}

/// Builds `count` plausible recommendations scattered around `center`
pub fn generate_recommendations(count: usize, center: Coordinates) -> Vec<Recommendation> {
    let now = Utc::now();
    let mut rng = thread_rng();
    let half_spread = SPREAD_DEGREES / 2.0;

    (0..count)
        .map(|i| {
            let tag_count = rng.gen_range(2..=4);
            let tags: Vec<String> = VIBE_TAGS
                .choose_multiple(&mut rng, tag_count)
                .map(|tag| tag.to_string())
                .collect();

            let venue = VENUES.choose(&mut rng).copied().unwrap_or("The Cozy Corner");
            let activity = ACTIVITIES
                .choose(&mut rng)
                .copied()
                .unwrap_or("Live Jazz Night");
            let age_secs = rng.gen_range(0..7 * 24 * 3600);

            Recommendation {
                recommendation_id: Uuid::new_v4().to_string(),
                title: format!("{} at {}", activity, venue),
                description: format!(
                    "Join us for a {} experience at {}. This event is trending with locals and visitors alike.",
                    tags.join(", "),
                    venue
                ),
                venue_id: Some(format!("venue-{}", i)),
                venue_name: Some(venue.to_string()),
                location: Some("Downtown, San Francisco".to_string()),
                latitude: center.latitude + rng.gen_range(-half_spread..half_spread),
                longitude: center.longitude + rng.gen_range(-half_spread..half_spread),
                vibe_tags: tags,
                trend_score: rng.gen_range(70..100),
                timestamp: now - Duration::seconds(age_secs),
                image_url: Some(format!("https://picsum.photos/seed/{}/400/300", i)),
                video_url: (i % 3 == 0).then(|| format!("https://example.com/video/{}", i)),
                social_media_url: Some(format!("https://example.com/social/{}", i)),
                match_score: None,
            }
        })
        .collect()
}
