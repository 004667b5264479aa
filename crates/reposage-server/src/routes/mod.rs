//! HTTP route handlers.

pub mod chat;
pub mod error;
pub mod files;
pub mod repos;
pub mod stats;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(stats::routes())
        .merge(repos::routes())
        .merge(files::routes())
        .merge(chat::routes())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "server running successfully" }))
}
