// crates/server/src/routes/sessions.rs
//! Session retrieval and listing endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use cc_dashboard_core::{SessionDetail, SessionInfo};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;

/// Query parameters for GET /api/sessions
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionsQuery {
    /// Full-text search. Takes precedence over `projectId`.
    pub q: Option<String>,
    pub project_id: Option<String>,
    /// Pagination limit (default 50)
    pub limit: Option<usize>,
    /// Pagination offset (default 0)
    pub offset: Option<usize>,
}

/// GET /api/sessions - Search, one project's sessions, or a page of all sessions.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionsQuery>,
) -> ApiResult<Json<Vec<SessionInfo>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
        return Ok(Json(state.stats.search_sessions(q, limit).await));
    }
    if let Some(project_id) = query.project_id.as_deref().filter(|p| !p.is_empty()) {
        return Ok(Json(state.stats.project_sessions(project_id).await?));
    }
    Ok(Json(
        state
            .stats
            .sessions(limit, query.offset.unwrap_or(0))
            .await,
    ))
}

/// GET /api/sessions/{id} - Summary plus transcript.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionDetail>> {
    state
        .stats
        .session_detail(&session_id)
        .await?
        .map(Json)
        .ok_or(ApiError::SessionNotFound(session_id))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(get_session))
}
