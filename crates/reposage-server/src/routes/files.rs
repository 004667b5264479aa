//! File upload route: extract, chunk, embed and store one document.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use super::error::ApiResult;
use crate::state::AppState;
use reposage_core::{DocumentMetadata, Error, FormatTag};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/files/upload-file", post(upload_file))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub repo_id: String,
    pub file_type: String,
    pub total_chunks: usize,
    pub message: String,
}

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    repo_name: String,
    repo_id: String,
    user_id: String,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, Error> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::InvalidRequest(format!("Failed to load file: {e}")))?;
                form.file = Some((filename, bytes.to_vec()));
            }
            "repo_name" | "repo_id" | "user_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| Error::InvalidRequest(format!("{name}: {e}")))?;
                match name.as_str() {
                    "repo_name" => form.repo_name = value,
                    "repo_id" => form.repo_id = value,
                    _ => form.user_id = value,
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /api/files/upload-file: multipart `file`, `repo_name`, `repo_id`, `user_id`.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let form = read_form(multipart).await?;
    let (filename, bytes) = form
        .file
        .ok_or_else(|| Error::InvalidRequest("missing 'file' field".into()))?;
    let filename = sanitize_filename(&filename);
    let format = FormatTag::from_filename(&filename)?;

    for (field, value) in [
        ("repo_id", &form.repo_id),
        ("repo_name", &form.repo_name),
        ("user_id", &form.user_id),
    ] {
        if value.trim().is_empty() {
            return Err(Error::InvalidRequest(format!("missing '{field}' field")).into());
        }
    }

    let metadata = DocumentMetadata::new(form.repo_id.as_str(), filename.as_str())
        .with_user(form.user_id.as_str())
        .with_repository_name(form.repo_name.as_str())
        .with_extra("file_type", format.extension());

    let total_chunks = {
        let state = state.clone();
        let repo_id = form.repo_id.clone();
        tokio::task::spawn_blocking(move || {
            state
                .orchestrator
                .ingest_document(bytes, format.as_str(), &repo_id, metadata)
        })
        .await
        .map_err(|e| Error::Internal(format!("ingestion task failed: {e}")))??
    };

    // Chunks are committed here; registry failures are logged, not returned.
    let bookkeeping = {
        let state = state.clone();
        let (repo_id, repo_name, user_id) =
            (form.repo_id.clone(), form.repo_name.clone(), form.user_id.clone());
        tokio::task::spawn_blocking(move || {
            state.registry.record_document(&repo_id, &repo_name, &user_id)
        })
        .await
        .map_err(|e| Error::Internal(format!("registry task failed: {e}")))
        .and_then(|result| result)
    };
    match bookkeeping {
        Ok(record) => info!(
            "Upload {} -> {}: {} chunks ({} documents)",
            filename, record.repo_id, total_chunks, record.no_docs
        ),
        Err(e) => warn!(
            "Upload {} -> {}: {} chunks stored but the registry was not updated: {}",
            filename, form.repo_id, total_chunks, e
        ),
    }

    Ok(Json(UploadResponse {
        success: true,
        filename,
        repo_id: form.repo_id,
        file_type: format.extension().to_string(),
        total_chunks,
        message: "Document processed successfully".into(),
    }))
}

/// Strip directory components from a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    let name = name.replace(['/', '\\'], "").replace("..", "");
    let name = name.trim();
    if name.is_empty() {
        "unnamed".to_string()
    } else {
        name.to_string()
    }
}
