use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures talking to the Ollama backend.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to build HTTP client: {reason}")]
    Client { reason: String },
    #[error("connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },
    #[error("request timed out after {after_secs}s")]
    Timeout { after_secs: u64 },
    #[error("Ollama API error: {status}")]
    Http { status: u16, body: String },
    #[error("invalid response body: {reason}")]
    Decode { reason: String },
    #[error("stream read error: {reason}")]
    Stream { reason: String },
    #[error("Ollama reported an error: {message}")]
    Backend { message: String },
    #[error("backend sent {count} consecutive malformed stream lines")]
    MalformedStream { count: usize },
}

impl InferenceError {
    pub(crate) fn from_reqwest(endpoint: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout {
                after_secs: timeout.as_secs(),
            }
        } else {
            InferenceError::Connection {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("Cannot connect to Ollama. Please ensure Ollama is running locally.")]
    BackendUnavailable,
    #[error("generation failed: {0}")]
    Generation(#[from] InferenceError),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
