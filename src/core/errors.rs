use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Fatal pipeline errors surfaced by search and import.
///
/// Transient rate limiting is retried inside the embedding client; only an
/// exhausted retry budget escalates to `RateLimitExhausted`. Filter
/// extraction never produces one of these — it fails open to "no filter".
#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding rate limit exhausted after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },
    #[error("embedding backend error: {0}")]
    EmbeddingBackend(String),
    #[error("vector store error: {0}")]
    VectorStore(String),
    #[error("answer generation failed: {0}")]
    AnswerGeneration(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::VectorStore(_) => ApiError::ServiceUnavailable,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
