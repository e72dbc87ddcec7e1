use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::store::{sort_by_distance, Store};
use crate::{
    error::{AppError, AppResult},
    models::{
        Area, Coordinates, Recommendation, RecommendationFilters, SubscriptionTier, User, Venue,
    },
};

/// Creates a PostgreSQL connection pool and applies pending migrations
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

const RECOMMENDATION_COLUMNS: &str = r#"recommendation_id, title, description, venue_id,
    venue_name, location, latitude, longitude, vibe_tags, trend_score, "timestamp",
    image_url, video_url, social_media_url"#;

const VENUE_COLUMNS: &str =
    "venue_id, name, address, latitude, longitude, categories, created_at, updated_at";

/// Row shape of the `users` table; the tier is stored as text
#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    preferences: Vec<String>,
    saved_locations: Vec<String>,
    subscription_tier: String,
    subscription_expiry: Option<DateTime<Utc>>,
    onboarding_complete: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let subscription_tier: SubscriptionTier =
            row.subscription_tier.parse().map_err(AppError::Internal)?;

        Ok(User {
            user_id: row.user_id,
            preferences: row.preferences,
            saved_locations: row.saved_locations,
            subscription_tier,
            subscription_expiry: row.subscription_expiry,
            onboarding_complete: row.onboarding_complete,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn get_recommendation(
        &self,
        recommendation_id: &str,
    ) -> AppResult<Option<Recommendation>> {
        let sql = format!(
            "SELECT {} FROM recommendations WHERE recommendation_id = $1",
            RECOMMENDATION_COLUMNS
        );
        let recommendation = sqlx::query_as::<_, Recommendation>(&sql)
            .bind(recommendation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(recommendation)
    }

    async fn get_recommendations_by_ids(&self, ids: &[String]) -> AppResult<Vec<Recommendation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM recommendations WHERE recommendation_id = ANY($1)",
            RECOMMENDATION_COLUMNS
        );
        let mut found = sqlx::query_as::<_, Recommendation>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        // Return in the caller's order
        let mut ordered = Vec::with_capacity(found.len());
        for id in ids {
            if let Some(pos) = found.iter().position(|r| &r.recommendation_id == id) {
                ordered.push(found.swap_remove(pos));
            }
        }
        Ok(ordered)
    }

    async fn get_recommendations_by_venue(
        &self,
        venue_id: &str,
    ) -> AppResult<Vec<Recommendation>> {
        let sql = format!(
            "SELECT {} FROM recommendations WHERE venue_id = $1 \
             ORDER BY trend_score DESC, recommendation_id",
            RECOMMENDATION_COLUMNS
        );
        let recommendations = sqlx::query_as::<_, Recommendation>(&sql)
            .bind(venue_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(recommendations)
    }

    async fn list_recommendations(
        &self,
        filters: &RecommendationFilters,
    ) -> AppResult<Vec<Recommendation>> {
        let bounds = ListBounds::from_filters(filters);
        let sql = format!(
            "SELECT {} FROM recommendations \
             WHERE (cardinality($1::text[]) = 0 OR vibe_tags && $1::text[]) \
               AND ($2::int IS NULL OR trend_score >= $2::int) \
               AND ($3::float8 IS NULL OR latitude BETWEEN $3::float8 AND $4::float8) \
               AND ($5::float8 IS NULL OR longitude BETWEEN $5::float8 AND $6::float8) \
             ORDER BY trend_score DESC, recommendation_id \
             LIMIT $7::bigint",
            RECOMMENDATION_COLUMNS
        );
        let (min, max) = bounds.corners.unzip();
        let mut recommendations = sqlx::query_as::<_, Recommendation>(&sql)
            .bind(&filters.vibe_tags)
            .bind(filters.min_trend_score)
            .bind(min.map(|c| c.latitude))
            .bind(max.map(|c| c.latitude))
            .bind(min.map(|c| c.longitude))
            .bind(max.map(|c| c.longitude))
            .bind(bounds.sql_limit)
            .fetch_all(&self.pool)
            .await?;

        // The box over-selects; keep only rows within the radius
        if let Some(area) = &filters.area {
            recommendations.retain(|r| area.contains(&r.coordinates()));
        }

        if let Some(limit) = filters.limit {
            recommendations.truncate(limit);
        }

        Ok(recommendations)
    }

    async fn upsert_recommendation(
        &self,
        recommendation: Recommendation,
    ) -> AppResult<Recommendation> {
        let sql = format!(
            r#"INSERT INTO recommendations ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (recommendation_id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                venue_id = EXCLUDED.venue_id,
                venue_name = EXCLUDED.venue_name,
                location = EXCLUDED.location,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                vibe_tags = EXCLUDED.vibe_tags,
                trend_score = EXCLUDED.trend_score,
                "timestamp" = EXCLUDED."timestamp",
                image_url = EXCLUDED.image_url,
                video_url = EXCLUDED.video_url,
                social_media_url = EXCLUDED.social_media_url
            RETURNING {columns}"#,
            columns = RECOMMENDATION_COLUMNS
        );

        let stored = sqlx::query_as::<_, Recommendation>(&sql)
            .bind(&recommendation.recommendation_id)
            .bind(&recommendation.title)
            .bind(&recommendation.description)
            .bind(&recommendation.venue_id)
            .bind(&recommendation.venue_name)
            .bind(&recommendation.location)
            .bind(recommendation.latitude)
            .bind(recommendation.longitude)
            .bind(&recommendation.vibe_tags)
            .bind(recommendation.trend_score)
            .bind(recommendation.timestamp)
            .bind(&recommendation.image_url)
            .bind(&recommendation.video_url)
            .bind(&recommendation.social_media_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(stored)
    }

    async fn delete_recommendation(&self, recommendation_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM recommendations WHERE recommendation_id = $1")
            .bind(recommendation_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, user_id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, preferences, saved_locations, subscription_tier,
                   subscription_expiry, onboarding_complete, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn upsert_user(&self, user: User) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (user_id, preferences, saved_locations, subscription_tier,
                               subscription_expiry, onboarding_complete, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                preferences = EXCLUDED.preferences,
                saved_locations = EXCLUDED.saved_locations,
                subscription_tier = EXCLUDED.subscription_tier,
                subscription_expiry = EXCLUDED.subscription_expiry,
                onboarding_complete = EXCLUDED.onboarding_complete,
                updated_at = EXCLUDED.updated_at
            RETURNING user_id, preferences, saved_locations, subscription_tier,
                      subscription_expiry, onboarding_complete, updated_at
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.preferences)
        .bind(&user.saved_locations)
        .bind(user.subscription_tier.to_string())
        .bind(user.subscription_expiry)
        .bind(user.onboarding_complete)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;

        User::try_from(row)
    }

    async fn get_venue(&self, venue_id: &str) -> AppResult<Option<Venue>> {
        let sql = format!("SELECT {} FROM venues WHERE venue_id = $1", VENUE_COLUMNS);
        let venue = sqlx::query_as::<_, Venue>(&sql)
            .bind(venue_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(venue)
    }

    async fn search_venues(&self, query: &str) -> AppResult<Vec<Venue>> {
        let sql = format!(
            "SELECT {} FROM venues WHERE name ILIKE '%' || $1 || '%' ORDER BY name",
            VENUE_COLUMNS
        );
        let venues = sqlx::query_as::<_, Venue>(&sql)
            .bind(escape_like(query))
            .fetch_all(&self.pool)
            .await?;
        Ok(venues)
    }

    async fn venues_by_category(&self, category: &str) -> AppResult<Vec<Venue>> {
        let sql = format!(
            "SELECT {} FROM venues WHERE $1 = ANY(categories) ORDER BY name",
            VENUE_COLUMNS
        );
        let venues = sqlx::query_as::<_, Venue>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        Ok(venues)
    }

    async fn venues_near(&self, area: Area) -> AppResult<Vec<Venue>> {
        let (min, max) = area.bounding_box();
        let sql = format!(
            "SELECT {} FROM venues \
             WHERE latitude BETWEEN $1 AND $2 AND longitude BETWEEN $3 AND $4",
            VENUE_COLUMNS
        );
        let mut venues = sqlx::query_as::<_, Venue>(&sql)
            .bind(min.latitude)
            .bind(max.latitude)
            .bind(min.longitude)
            .bind(max.longitude)
            .fetch_all(&self.pool)
            .await?;

        venues.retain(|v| area.contains(&v.coordinates()));
        sort_by_distance(&mut venues, &area);
        Ok(venues)
    }

    async fn upsert_venue(&self, venue: Venue) -> AppResult<Venue> {
        let sql = format!(
            r#"INSERT INTO venues ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (venue_id) DO UPDATE SET
                name = EXCLUDED.name,
                address = EXCLUDED.address,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                categories = EXCLUDED.categories,
                updated_at = EXCLUDED.updated_at
            RETURNING {columns}"#,
            columns = VENUE_COLUMNS
        );

        let stored = sqlx::query_as::<_, Venue>(&sql)
            .bind(&venue.venue_id)
            .bind(&venue.name)
            .bind(&venue.address)
            .bind(venue.latitude)
            .bind(venue.longitude)
            .bind(&venue.categories)
            .bind(venue.created_at)
            .bind(venue.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(stored)
    }
}

/// SQL-side bounds for a recommendation listing
#[derive(Debug, PartialEq)]
struct ListBounds {
    /// Bounding box corners of the search area, if any
    corners: Option<(Coordinates, Coordinates)>,
    /// Row limit applied in SQL; only safe without an area, since the box
    /// over-selects and the exact distance check runs afterwards
    sql_limit: Option<i64>,
}

impl ListBounds {
    fn from_filters(filters: &RecommendationFilters) -> Self {
        match &filters.area {
            Some(area) => Self {
                corners: Some(area.bounding_box()),
                sql_limit: None,
            },
            None => Self {
                corners: None,
                sql_limit: filters
                    .limit
                    .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX)),
            },
        }
    }
}

/// Escapes `LIKE` wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_bar"), "50\\% off\\_bar");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_list_bounds_without_area_pushes_limit() {
        let filters = RecommendationFilters {
            limit: Some(10),
            ..Default::default()
        };
        let bounds = ListBounds::from_filters(&filters);
        assert_eq!(bounds.corners, None);
        assert_eq!(bounds.sql_limit, Some(10));
    }

    #[test]
    fn test_list_bounds_with_area_uses_box_and_no_sql_limit() {
        let area = Area {
            center: Coordinates::new(37.7749, -122.4194),
            radius_km: 5.0,
        };
        let filters = RecommendationFilters {
            area: Some(area),
            limit: Some(10),
            ..Default::default()
        };

        let bounds = ListBounds::from_filters(&filters);
        assert_eq!(bounds.sql_limit, None);

        let (min, max) = bounds.corners.unwrap();
        assert!(min.latitude < 37.7749 && 37.7749 < max.latitude);
        assert!(min.longitude < -122.4194 && -122.4194 < max.longitude);
        // 5 km is roughly 0.045 degrees of latitude each way
        assert!(max.latitude - min.latitude < 0.2);
    }

    #[test]
    fn test_user_row_rejects_unknown_tier() {
        let row = UserRow {
            user_id: "0xabc".to_string(),
            preferences: vec![],
            saved_locations: vec![],
            subscription_tier: "gold".to_string(),
            subscription_expiry: None,
            onboarding_complete: false,
            updated_at: Utc::now(),
        };
        assert!(User::try_from(row).is_err());
    }

    #[test]
    fn test_user_row_converts() {
        let row = UserRow {
            user_id: "0xabc".to_string(),
            preferences: vec!["chill".to_string()],
            saved_locations: vec![],
            subscription_tier: "premium".to_string(),
            subscription_expiry: None,
            onboarding_complete: true,
            updated_at: Utc::now(),
        };
        let user = User::try_from(row).unwrap();
        assert_eq!(user.subscription_tier, SubscriptionTier::Premium);
        assert!(user.onboarding_complete);
    }
}
