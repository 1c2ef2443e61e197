//! Client-facing error taxonomy for the summary endpoint.
//!
//! Every variant maps to a fixed status code and a single-key `{"error": "..."}` body.
//! Internal detail is logged by the caller and never carried here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Invalid request: send JSON with decisions array.")]
    InvalidRequest,
    #[error("Groq API key not configured. Set api_key in profile-summary.toml or GROQ_API_KEY.")]
    ConfigMissing,
    #[error("Groq API request failed. Check key and network.")]
    UpstreamUnavailable,
    /// Account-level exhaustion upstream. Sent with 200 so clients can show it inline.
    #[error("AI tokens expired - AI summary currently unavailable")]
    UpstreamQuotaExhausted,
}

impl EndpointError {
    pub fn status(&self) -> StatusCode {
        match self {
            EndpointError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            EndpointError::InvalidRequest => StatusCode::BAD_REQUEST,
            EndpointError::ConfigMissing => StatusCode::INTERNAL_SERVER_ERROR,
            EndpointError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            EndpointError::UpstreamQuotaExhausted => StatusCode::OK,
        }
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
