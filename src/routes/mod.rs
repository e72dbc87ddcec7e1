use axum::{
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    state::AppState,
};

pub mod recommendations;
pub mod subscriptions;
pub mod users;
pub mod venues;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recommendations
        .route(
            "/recommendations",
            get(recommendations::list).post(recommendations::create),
        )
        .route(
            "/recommendations/personalized",
            get(recommendations::personalized),
        )
        .route("/recommendations/mock", post(recommendations::generate_mock))
        .route(
            "/recommendations/:id",
            get(recommendations::get)
                .patch(recommendations::update)
                .delete(recommendations::delete),
        )
        // Venues
        .route("/venues", get(venues::search).post(venues::create))
        .route("/venues/:id", get(venues::get))
        // Users
        .route("/users/me", get(users::me).post(users::upsert_me))
        .route("/users/:id", get(users::get))
        .route("/users/:id/preferences", patch(users::update_preferences))
        .route("/users/:id/onboarding", post(users::complete_onboarding))
        .route(
            "/users/:id/saved-locations",
            get(users::saved_locations)
                .post(users::save_location)
                .delete(users::remove_saved_location),
        )
        // Subscriptions
        .route(
            "/subscriptions",
            get(subscriptions::status).post(subscriptions::update),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
