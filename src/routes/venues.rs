use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{Venue, VenueDetails, VenueInput},
    routes::recommendations::parse_area,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct VenueQuery {
    /// Name substring
    pub query: Option<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

/// Name search, category lookup or proximity search, in that order of precedence
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<VenueQuery>,
) -> AppResult<Json<Vec<Venue>>> {
    let venues = if let Some(query) = params.query {
        state.venues.search(&query).await?
    } else if let Some(category) = params.category {
        state.venues.by_category(&category).await?
    } else if let (Some(latitude), Some(longitude)) = (params.latitude, params.longitude) {
        let area = parse_area(latitude, longitude, params.radius)?;
        state.venues.nearby(area).await?
    } else {
        return Err(AppError::InvalidInput(
            "Missing search parameters".to_string(),
        ));
    };

    Ok(Json(venues))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<VenueDetails>> {
    let details = state.venues.details(&id).await?;
    Ok(Json(details))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<VenueInput>,
) -> AppResult<(StatusCode, Json<Venue>)> {
    let venue = state.venues.create(input).await?;
    Ok((StatusCode::CREATED, Json(venue)))
}
