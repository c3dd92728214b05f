//! Storage management endpoints (spec §6 "store management").

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use discuss_store::Metadata;

use crate::api::error::ApiError;
use crate::state::AppState;

pub async fn backup(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let dest = state.store.backup()?;
    Ok(Json(json!({ "success": true, "path": dest.display().to_string() })))
}

pub async fn cleanup(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state.store.cleanup()?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    #[serde(flatten)]
    metadata: Metadata,
    discussion_count: usize,
}

pub async fn info(State(state): State<AppState>) -> Json<StorageInfo> {
    let metadata = state.store.metadata();
    let discussion_count = state.store.list().len();
    Json(StorageInfo { metadata, discussion_count })
}
