use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{SubscriptionRequest, SubscriptionStatus},
    state::AppState,
};

pub async fn status(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<SubscriptionStatus>> {
    state.users.get_or_create(user.id()).await?;
    let status = state.subscriptions.status(user.id(), Utc::now()).await?;
    Ok(Json(status))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SubscriptionRequest>,
) -> AppResult<Json<SubscriptionStatus>> {
    state.users.get_or_create(user.id()).await?;
    let status = state
        .subscriptions
        .update(user.id(), &request.tier, Utc::now())
        .await?;
    Ok(Json(status))
}
