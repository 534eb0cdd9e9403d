// crates/server/src/routes/projects.rs
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use cc_dashboard_core::ProjectInfo;

use crate::state::AppState;

/// GET /api/projects - Per-project rollups, most recently active first.
pub async fn list_projects(State(state): State<Arc<AppState>>) -> Json<Vec<ProjectInfo>> {
    Json(state.stats.projects().await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/projects", get(list_projects))
}
