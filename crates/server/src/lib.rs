// crates/server/src/lib.rs
//! HTTP server for the Claude Code usage dashboard.
//!
//! A thin Axum layer over [`cc_dashboard_stats::StatsService`]: every route
//! maps onto one read operation, plus the live/imported data source switch.

pub mod config;
pub mod data_source;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use data_source::{DataSource, SourceKind};
pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
