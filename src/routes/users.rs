use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::{normalize_user_id, CurrentUser},
    models::{PublicUser, Recommendation, User, UserUpdate},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PreferencesRequest {
    pub preferences: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SavedLocationRequest {
    pub recommendation_id: String,
}

/// Full record for the owner, public subset for everyone else
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UserView {
    Owner(User),
    Public(PublicUser),
}

pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let record = state.users.get_or_create(user.id()).await?;
    Ok(Json(record))
}

pub async fn upsert_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    let record = state.users.create_or_update(user.id(), update).await?;
    Ok(Json(record))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserView>> {
    let id = normalize_user_id(&id);
    let record = state.users.get(&id).await?;

    if id == user.id() {
        Ok(Json(UserView::Owner(record)))
    } else {
        Ok(Json(UserView::Public(record.into())))
    }
}

pub async fn update_preferences(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<PreferencesRequest>,
) -> AppResult<Json<User>> {
    user.ensure_owner(&id)?;
    let record = state
        .users
        .update_preferences(user.id(), request.preferences)
        .await?;
    Ok(Json(record))
}

pub async fn complete_onboarding(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    user.ensure_owner(&id)?;
    let record = state.users.complete_onboarding(user.id()).await?;
    Ok(Json(record))
}

pub async fn saved_locations(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Recommendation>>> {
    user.ensure_owner(&id)?;
    let saved = state.users.saved_recommendations(user.id()).await?;
    Ok(Json(saved))
}

pub async fn save_location(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<SavedLocationRequest>,
) -> AppResult<Json<User>> {
    user.ensure_owner(&id)?;
    let record = state
        .users
        .save_location(user.id(), &request.recommendation_id)
        .await?;
    Ok(Json(record))
}

pub async fn remove_saved_location(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(request): Query<SavedLocationRequest>,
) -> AppResult<Json<User>> {
    user.ensure_owner(&id)?;
    let record = state
        .users
        .remove_saved_location(user.id(), &request.recommendation_id)
        .await?;
    Ok(Json(record))
}
