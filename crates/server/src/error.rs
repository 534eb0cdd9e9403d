// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cc_dashboard_core::DiscoveryError;
use cc_dashboard_stats::{SnapshotError, StatsError};
use serde::Serialize;
use thiserror::Error;

use crate::data_source::DataSourceError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Stats error: {0}")]
    Stats(#[from] StatsError),

    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<DiscoveryError> for ApiError {
    fn from(err: DiscoveryError) -> Self {
        ApiError::Stats(StatsError::Discovery(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::SessionNotFound(id) => {
                tracing::warn!(session_id = %id, "Session not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Session not found", format!("Session ID: {}", id)),
                )
            }
            ApiError::Stats(StatsError::Snapshot(snapshot_err)) => {
                let error_msg = match snapshot_err {
                    SnapshotError::Io { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "Cannot read stats snapshot");
                        "Failed to read stats snapshot"
                    }
                    SnapshotError::Malformed { path, message } => {
                        tracing::error!(path = %path.display(), message = %message, "Malformed stats snapshot");
                        "Malformed stats snapshot"
                    }
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details(error_msg, snapshot_err.to_string()),
                )
            }
            ApiError::Stats(StatsError::Discovery(discovery_err)) => {
                let (status, error_msg) = match discovery_err {
                    DiscoveryError::InvalidId(id) => {
                        tracing::warn!(id = %id, "Rejected identifier");
                        (StatusCode::BAD_REQUEST, "Invalid identifier")
                    }
                    DiscoveryError::HomeDirNotFound => {
                        tracing::error!("Home directory not found");
                        (StatusCode::INTERNAL_SERVER_ERROR, "Home directory not found")
                    }
                };
                (
                    status,
                    ErrorResponse::with_details(error_msg, discovery_err.to_string()),
                )
            }
            ApiError::DataSource(DataSourceError::NoImportedData) => {
                tracing::warn!("Switch to imported data rejected: nothing imported");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("No imported data available"),
                )
            }
            ApiError::DataSource(err @ DataSourceError::Io { .. }) => {
                tracing::error!(error = %err, "Failed to switch data source");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Failed to switch data source", err.to_string()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
        };
        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::path::PathBuf;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_session_not_found_returns_404() {
        let response = ApiError::SessionNotFound("abc123".to_string()).into_response();
        let (status, body) = extract_response(response).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Session not found");
        assert!(body.details.unwrap().contains("abc123"));
    }

    #[tokio::test]
    async fn test_malformed_snapshot_returns_500() {
        let error: ApiError = StatsError::Snapshot(SnapshotError::Malformed {
            path: PathBuf::from("/x/stats-cache.json"),
            message: "EOF while parsing".into(),
        })
        .into();
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Malformed stats snapshot");
        assert!(body.details.unwrap().contains("/x/stats-cache.json"));
    }

    #[tokio::test]
    async fn test_invalid_id_returns_400() {
        let error: ApiError = DiscoveryError::InvalidId("../etc".into()).into();
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid identifier");
    }

    #[tokio::test]
    async fn test_home_dir_not_found_returns_500() {
        let error: ApiError = DiscoveryError::HomeDirNotFound.into();
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Home directory not found");
    }

    #[tokio::test]
    async fn test_no_imported_data_returns_400() {
        let error: ApiError = DataSourceError::NoImportedData.into();
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "No imported data available");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_bad_request_carries_message() {
        let error = ApiError::BadRequest("Invalid source: \"x\"".into());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Bad request");
        assert!(body.details.unwrap().contains("Invalid source"));
    }
}
