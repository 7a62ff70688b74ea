use axum::{extract::State, Json};

use super::error::ApiError;
use super::state::AppState;
use crate::types::models::DashboardSnapshot;
use crate::types::view::DashboardView;

pub async fn health() -> &'static str {
    "ok"
}

/// The latest snapshot as-is, including while the first cycle is loading.
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.current())
}

pub async fn get_dashboard_view(State(state): State<AppState>) -> Result<Json<DashboardView>, ApiError> {
    let snapshot = state.current();
    if snapshot.is_loading {
        return Err(ApiError::NotReady);
    }
    Ok(Json(DashboardView::from_snapshot(&state.token_mint, &snapshot)))
}
