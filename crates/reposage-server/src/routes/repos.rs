//! Repository routes: create and list repositories.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use crate::state::AppState;
use reposage_core::Error;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/repo/create_repo", post(create_repo))
        .route("/repo/get-repositories", get(get_repositories))
}

#[derive(Debug, Deserialize)]
pub struct CreateRepoRequest {
    pub repo_name: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRepoResponse {
    pub repo_id: String,
    pub repo_name: String,
    pub user_id: String,
    pub no_docs: u64,
}

#[derive(Debug, Serialize)]
pub struct RepoSummary {
    pub repo_id: String,
    pub repo_name: String,
    pub no_docs: u64,
}

#[derive(Debug, Serialize)]
pub struct RepositoriesResponse {
    pub repositories: Vec<RepoSummary>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesQuery {
    #[serde(default)]
    pub user_id: String,
}

/// POST /api/repo/create_repo: register a repository and provision its collection.
async fn create_repo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRepoRequest>,
) -> ApiResult<Json<CreateRepoResponse>> {
    let record = tokio::task::spawn_blocking(move || {
        state.registry.create(&req.repo_name, &req.user_id, |repo_id| {
            state.orchestrator.provision_repository(repo_id).map(|_| ())
        })
    })
    .await
    .map_err(|e| Error::Internal(format!("repository creation task failed: {e}")))??;

    Ok(Json(CreateRepoResponse {
        repo_id: record.repo_id,
        repo_name: record.repo_name,
        user_id: record.user_id,
        no_docs: record.no_docs,
    }))
}

/// GET /api/repo/get-repositories?user_id=: repositories owned by a user.
async fn get_repositories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RepositoriesQuery>,
) -> ApiResult<Json<RepositoriesResponse>> {
    if query.user_id.trim().is_empty() {
        return Err(Error::InvalidRequest("user_id is required".into()).into());
    }

    let repositories = state
        .registry
        .list_for_user(&query.user_id)
        .into_iter()
        .map(|r| RepoSummary {
            repo_id: r.repo_id,
            repo_name: r.repo_name,
            no_docs: r.no_docs,
        })
        .collect();

    Ok(Json(RepositoriesResponse { repositories }))
}
