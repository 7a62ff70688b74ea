use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use super::handlers::{get_dashboard, get_dashboard_view, health};
use super::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/view", get(get_dashboard_view))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
