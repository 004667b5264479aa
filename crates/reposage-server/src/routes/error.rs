//! Mapping from the error taxonomy to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use reposage_core::Error;

/// Handler error: renders as `{"error": message, "kind": kind}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            Error::CollectionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Embedding(_) | Error::GenerationFailure(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", self.0.kind(), self.0);
        } else {
            warn!("Request rejected ({}): {}", self.0.kind(), self.0);
        }

        (
            status,
            Json(serde_json::json!({
                "error": self.0.to_string(),
                "kind": self.0.kind(),
            })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::UnsupportedFormat("docx".into()), 400),
            (Error::EmptyContent("blank".into()), 400),
            (Error::Decode("bad pdf".into()), 400),
            (Error::InvalidRequest("no query".into()), 400),
            (Error::NotFound("repo".into()), 404),
            (Error::CollectionUnavailable("locked".into()), 503),
            (Error::Embedding("model".into()), 502),
            (Error::GenerationFailure("timeout".into()), 502),
            (Error::Config("dim".into()), 500),
            (Error::Internal("join".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError(err).status().as_u16(), code);
        }
    }
}
