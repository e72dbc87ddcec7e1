use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::geo::{Area, Coordinates};

pub const MAX_TREND_SCORE: i32 = 100;

/// A trending spot surfaced to users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Recommendation {
    pub recommendation_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub venue_id: Option<String>,
    #[serde(default)]
    pub venue_name: Option<String>,
    /// Free-text area, e.g. "Downtown, San Francisco"
    #[serde(default)]
    pub location: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub vibe_tags: Vec<String>,
    /// Popularity in `0..=100`
    pub trend_score: i32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub social_media_url: Option<String>,
    /// Blended relevance, only present on premium-ranked results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[sqlx(skip)]
    pub match_score: Option<f64>,
}

impl Recommendation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn has_any_tag<'a>(&self, tags: impl IntoIterator<Item = &'a String>) -> bool {
        tags.into_iter().any(|tag| self.vibe_tags.contains(tag))
    }
}

/// Body of a create-or-update request
///
/// Missing `trend_score`, `timestamp` and `recommendation_id` are filled in by the
/// service layer.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RecommendationInput {
    #[serde(default)]
    pub recommendation_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub venue_id: Option<String>,
    #[serde(default)]
    pub venue_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub vibe_tags: Vec<String>,
    #[serde(default)]
    pub trend_score: Option<i32>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub social_media_url: Option<String>,
}

/// Partial update merged over an existing recommendation
///
/// Absent fields keep their value. For the optional fields an explicit `null` clears
/// the stored value, hence the nested `Option`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RecommendationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub venue_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub venue_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vibe_tags: Option<Vec<String>>,
    pub trend_score: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub video_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub social_media_url: Option<Option<String>>,
}

/// Maps a present field to `Some`, so `null` becomes `Some(None)`
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RecommendationPatch {
    /// Overlays the fields present in the patch onto `existing`
    pub fn apply(self, existing: Recommendation) -> RecommendationInput {
        RecommendationInput {
            recommendation_id: Some(existing.recommendation_id),
            title: self.title.unwrap_or(existing.title),
            description: self.description.unwrap_or(existing.description),
            venue_id: self.venue_id.unwrap_or(existing.venue_id),
            venue_name: self.venue_name.unwrap_or(existing.venue_name),
            location: self.location.unwrap_or(existing.location),
            latitude: self.latitude.unwrap_or(existing.latitude),
            longitude: self.longitude.unwrap_or(existing.longitude),
            vibe_tags: self.vibe_tags.unwrap_or(existing.vibe_tags),
            trend_score: Some(self.trend_score.unwrap_or(existing.trend_score)),
            timestamp: Some(existing.timestamp),
            image_url: self.image_url.unwrap_or(existing.image_url),
            video_url: self.video_url.unwrap_or(existing.video_url),
            social_media_url: self.social_media_url.unwrap_or(existing.social_media_url),
        }
    }
}

/// Store-level listing filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationFilters {
    /// Keep recommendations sharing at least one of these tags (ignored when empty)
    pub vibe_tags: Vec<String>,
    pub area: Option<Area>,
    pub min_trend_score: Option<i32>,
    pub limit: Option<usize>,
}

impl RecommendationFilters {
    pub fn matches(&self, recommendation: &Recommendation) -> bool {
        if !self.vibe_tags.is_empty() && !recommendation.has_any_tag(&self.vibe_tags) {
            return false;
        }

        if let Some(min) = self.min_trend_score {
            if recommendation.trend_score < min {
                return false;
            }
        }

        match &self.area {
            Some(area) => area.contains(&recommendation.coordinates()),
            None => true,
        }
    }
}

/// Normalizes user-supplied vibe tags: trimmed, lowercased, deduplicated, order kept
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}


#[cfg(test)]
mod tests {
    use super::fixtures::recommendation;
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " Chill".to_string(),
            "lively".to_string(),
            "chill".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["chill", "lively"]);
    }

    #[test]
    fn test_filters_by_tag_overlap() {
        let filters = RecommendationFilters {
            vibe_tags: vec!["romantic".to_string(), "chill".to_string()],
            ..Default::default()
        };
        assert!(filters.matches(&recommendation("a", &["chill", "lively"], 80)));
        assert!(!filters.matches(&recommendation("b", &["loud"], 99)));
    }

    #[test]
    fn test_filters_by_min_trend_score() {
        let filters = RecommendationFilters {
            min_trend_score: Some(75),
            ..Default::default()
        };
        assert!(filters.matches(&recommendation("a", &[], 75)));
        assert!(!filters.matches(&recommendation("b", &[], 74)));
    }

    #[test]
    fn test_filters_by_area() {
        let filters = RecommendationFilters {
            area: Some(Area {
                center: Coordinates::new(40.7128, -74.0060),
                radius_km: 5.0,
            }),
            ..Default::default()
        };
        assert!(!filters.matches(&recommendation("sf", &[], 90)));
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let existing = recommendation("a", &["chill"], 80);
        let patch = RecommendationPatch {
            trend_score: Some(95),
            ..Default::default()
        };

        let merged = patch.apply(existing.clone());
        assert_eq!(merged.recommendation_id.as_deref(), Some("a"));
        assert_eq!(merged.title, existing.title);
        assert_eq!(merged.vibe_tags, existing.vibe_tags);
        assert_eq!(merged.trend_score, Some(95));
        assert_eq!(merged.timestamp, Some(existing.timestamp));
    }

    #[test]
    fn test_patch_null_clears_optional_fields() {
        let mut existing = recommendation("a", &["chill"], 80);
        existing.venue_id = Some("venue-1".to_string());
        existing.image_url = Some("https://example.com/a.jpg".to_string());

        let patch: RecommendationPatch = serde_json::from_value(serde_json::json!({
            "venue_id": null,
            "video_url": "https://example.com/a.mp4"
        }))
        .unwrap();

        let merged = patch.apply(existing.clone());
        assert_eq!(merged.venue_id, None);
        assert_eq!(merged.image_url, existing.image_url);
        assert_eq!(merged.video_url.as_deref(), Some("https://example.com/a.mp4"));
        assert_eq!(merged.venue_name, existing.venue_name);
    }

    #[test]
    fn test_match_score_omitted_when_absent() {
        let json = serde_json::to_value(recommendation("a", &["chill"], 80)).unwrap();
        assert!(json.get("match_score").is_none());
        assert_eq!(json["vibe_tags"][0], "chill");
    }
}
