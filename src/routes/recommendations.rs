use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::{CurrentUser, RequestId},
    models::{
        normalize_tags, Area, Coordinates, Recommendation, RecommendationFilters,
        RecommendationInput, RecommendationPatch, DEFAULT_RADIUS_KM,
    },
    services::mock::DEFAULT_CENTER,
    state::AppState,
};

/// Default number of generated mock recommendations
const DEFAULT_MOCK_COUNT: usize = 10;

/// Query string shared by the list and personalized endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Comma-separated vibe tags
    pub vibe_tags: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Search radius in kilometres
    pub radius: Option<f64>,
    pub min_trend_score: Option<i32>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn into_filters(self) -> AppResult<RecommendationFilters> {
        let vibe_tags = self
            .vibe_tags
            .map(|tags| normalize_tags(tags.split(',').map(str::to_string)))
            .unwrap_or_default();

        let area = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                Some(parse_area(latitude, longitude, self.radius)?)
            }
            (None, None) => None,
            _ => {
                return Err(AppError::InvalidInput(
                    "latitude and longitude must be given together".to_string(),
                ))
            }
        };

        Ok(RecommendationFilters {
            vibe_tags,
            area,
            min_trend_score: self.min_trend_score,
            limit: self.limit,
        })
    }
}

/// Validated search area; the radius defaults to [`DEFAULT_RADIUS_KM`]
pub(crate) fn parse_area(latitude: f64, longitude: f64, radius: Option<f64>) -> AppResult<Area> {
    let center = Coordinates::new(latitude, longitude);
    if !center.is_valid() {
        return Err(AppError::InvalidInput("Invalid coordinates".to_string()));
    }

    let radius_km = radius.unwrap_or(DEFAULT_RADIUS_KM);
    if !(radius_km.is_finite() && radius_km > 0.0) {
        return Err(AppError::InvalidInput("radius must be positive".to_string()));
    }

    Ok(Area { center, radius_km })
}

#[derive(Debug, Default, Deserialize)]
pub struct MockRequest {
    pub count: Option<usize>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// An empty body means all defaults; anything else must be a valid request
fn parse_mock_request(body: &[u8]) -> AppResult<MockRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(MockRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let filters = query.into_filters()?;
    let recommendations = state.recommendations.list(&filters).await?;
    Ok(Json(recommendations))
}

pub async fn personalized(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let filters = query.into_filters()?;
    let user = state.users.get_or_create(user.id()).await?;
    let recommendations = state
        .recommendations
        .personalized(&user, filters, Utc::now())
        .await?;
    Ok(Json(recommendations))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> AppResult<Json<Recommendation>> {
    let recommendation = state.recommendations.get_by_id(&id).await?;

    tracing::info!(
        request_id = %request_id,
        recommendation_id = %recommendation.recommendation_id,
        event = "view",
        "Recommendation viewed"
    );

    Ok(Json(recommendation))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<RecommendationInput>,
) -> AppResult<(StatusCode, Json<Recommendation>)> {
    let recommendation = state.recommendations.upsert(input).await?;
    Ok((StatusCode::CREATED, Json(recommendation)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<RecommendationPatch>,
) -> AppResult<Json<Recommendation>> {
    let recommendation = state.recommendations.update(&id, patch).await?;
    Ok(Json(recommendation))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.recommendations.delete(&id).await?;
    tracing::info!(user_id = %user.id(), recommendation_id = %id, "Deleted by user");
    Ok(Json(json!({ "success": true })))
}

pub async fn generate_mock(
    State(state): State<AppState>,
    _user: CurrentUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Vec<Recommendation>>)> {
    let request = parse_mock_request(&body)?;

    let center = match (request.latitude, request.longitude) {
        (Some(latitude), Some(longitude)) => Coordinates::new(latitude, longitude),
        (None, None) => DEFAULT_CENTER,
        _ => {
            return Err(AppError::InvalidInput(
                "latitude and longitude must be given together".to_string(),
            ))
        }
    };

    let generated = state
        .recommendations
        .generate_mock(request.count.unwrap_or(DEFAULT_MOCK_COUNT), center)
        .await?;
    Ok((StatusCode::CREATED, Json(generated)))
}
