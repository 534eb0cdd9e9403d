// crates/server/src/routes/stats.rs
//! Dashboard statistics endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use cc_dashboard_stats::DashboardStats;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/stats - Snapshot totals reconciled with newer session activity.
pub async fn dashboard_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardStats>> {
    let start = Instant::now();
    let stats = state.stats.dashboard_stats().await?;
    tracing::debug!(
        total_sessions = stats.total_sessions,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Dashboard stats assembled"
    );
    Ok(Json(stats))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(dashboard_stats))
}
