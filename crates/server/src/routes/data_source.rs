// crates/server/src/routes/data_source.rs
//! Switching between live and imported data.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::data_source::{ImportMeta, SourceKind};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceResponse {
    pub active: SourceKind,
    pub has_imported_data: bool,
    pub import_meta: Option<ImportMeta>,
}

#[derive(Debug, Deserialize)]
pub struct SetDataSourceRequest {
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct SetDataSourceResponse {
    pub active: SourceKind,
}

/// GET /api/data-source
pub async fn get_data_source(State(state): State<Arc<AppState>>) -> Json<DataSourceResponse> {
    let ds = &state.data_source;
    Json(DataSourceResponse {
        active: ds.active().await,
        has_imported_data: ds.has_imported_data().await,
        import_meta: ds.import_meta().await,
    })
}

/// PUT /api/data-source - `{"source": "live" | "imported"}`
pub async fn set_data_source(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetDataSourceRequest>,
) -> ApiResult<Json<SetDataSourceResponse>> {
    let kind = SourceKind::parse(&body.source)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid source: {:?}", body.source)))?;
    state.data_source.set_active(kind).await?;
    Ok(Json(SetDataSourceResponse { active: kind }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/data-source", get(get_data_source).put(set_data_source))
}
