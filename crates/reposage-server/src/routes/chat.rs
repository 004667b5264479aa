//! Chat route: retrieval-augmented answer over a set of repositories.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use super::error::ApiResult;
use crate::state::AppState;
use reposage_chat::types::{ChatRequest, ChatResponse};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ai/chat", post(chat))
}

/// POST /api/ai/chat
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let start = Instant::now();
    let answer = state
        .orchestrator
        .answer_query(&req.query, &req.repo_ids)
        .await?;

    let response_repo_names = answer
        .contributing
        .iter()
        .map(|id| display_name(&state, &req, id))
        .collect();

    info!(
        "Chat for {}: {} repositories asked, {} contributed, {} passages, {}ms",
        if req.user_id.is_empty() { "anonymous" } else { req.user_id.as_str() },
        req.repo_ids.len(),
        answer.contributing.len(),
        answer.passages,
        start.elapsed().as_millis()
    );

    Ok(Json(ChatResponse {
        response: answer.text,
        response_repo_ids: answer.contributing,
        response_repo_names,
    }))
}

/// Name sent alongside `repo_id` in the request, else the registered name,
/// else the id itself.
fn display_name(state: &AppState, req: &ChatRequest, repo_id: &str) -> String {
    req.repo_ids
        .iter()
        .position(|id| id == repo_id)
        .and_then(|i| req.repo_names.get(i))
        .filter(|name| !name.trim().is_empty())
        .cloned()
        .or_else(|| state.registry.get(repo_id).map(|r| r.repo_name))
        .unwrap_or_else(|| repo_id.to_string())
}
