// crates/server/src/routes/mod.rs
//! API route handlers for the dashboard server.

pub mod data_source;
pub mod health;
pub mod projects;
pub mod sessions;
pub mod stats;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET /api/health - Health check
/// - GET /api/stats - Dashboard statistics
/// - GET /api/projects - Per-project rollups
/// - GET /api/sessions?q=&projectId=&limit=&offset= - Session listings
/// - GET /api/sessions/{id} - Session detail with transcript
/// - GET /api/data-source - Active data source and import metadata
/// - PUT /api/data-source - Switch between live and imported data
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", stats::router())
        .nest("/api", projects::router())
        .nest("/api", sessions::router())
        .nest("/api", data_source::router())
        .with_state(state)
}
