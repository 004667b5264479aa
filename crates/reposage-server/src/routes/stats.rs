//! Stats route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(get_stats))
}

/// GET /api/stats: index, pipeline and provider status.
async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let status = state.orchestrator.status()?;

    Ok(Json(serde_json::json!({
        "index": status.index,
        "repositories": state.registry.len(),
        "embedderModel": status.embedder_model,
        "generator": status.generator,
        "fanout": status.fanout,
        "perCollectionLimit": status.per_collection_limit,
        "chunkSize": status.chunk_size,
        "chunkOverlap": status.chunk_overlap,
        "llm": state.llm_status,
        "port": state.config.port,
    })))
}
