use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use routing::AgentId;
use serde_json::json;
use thiserror::Error;

/// Failures surfaced to HTTP clients.
///
/// Not-actionable events are not errors; they are answered with `200` by the
/// webhook handler directly.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid signature, bearer token, or admin key header.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Admin key present but wrong.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Body is not valid JSON or does not match the webhook schema.
    #[error("{0}")]
    MalformedInput(String),

    /// The pipeline components have not been installed yet.
    #[error("Service not initialized")]
    NotInitialized,

    /// The remote agent API failed.
    #[error("{error}")]
    Upstream {
        error: String,
        agent_id: Option<AgentId>,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
            Self::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Upstream { error, agent_id } => json!({
                "status": "error",
                "error": error,
                "agent_id": agent_id,
            }),
            other => json!({
                "status": "error",
                "error": other.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
