//! Admin endpoints and their key gate.

use axum::extract::{Path, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use routing::verifier::constant_time_eq;
use routing::{AgentApiError, Session, SessionId, SessionStatus};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::{ApiError, AppState, ConfigSummary, ADMIN_KEY_HEADER};

/// Open when no admin key is configured. Otherwise a missing header is `401`
/// and a wrong key is `403`.
pub(crate) async fn require_admin_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_key() else {
        return Ok(next.run(request).await);
    };

    let Some(provided) = headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()) else {
        warn!("admin request without X-API-Key header");
        return Err(ApiError::Unauthorized("Missing X-API-Key header"));
    };
    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        warn!("admin request with invalid API key");
        return Err(ApiError::Forbidden("Invalid API key"));
    }
    Ok(next.run(request).await)
}

pub(crate) async fn list_sessions(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let sessions = state.services()?.dispatcher.sessions().list();
    Ok(Json(json!({
        "count": sessions.len(),
        "sessions": sessions,
    })))
}

#[derive(Serialize)]
pub(crate) struct SessionDetail {
    #[serde(flatten)]
    status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracked: Option<Session>,
}

pub(crate) async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    let dispatcher = &state.services()?.dispatcher;
    let session_id = SessionId::new(session_id)
        .ok_or_else(|| ApiError::MalformedInput("empty session id".into()))?;

    let status = dispatcher
        .check_session_status(&session_id)
        .await
        .map_err(|err| match err {
            AgentApiError::InvalidRequest { .. } => ApiError::MalformedInput(err.to_string()),
            other => ApiError::Upstream {
                error: other.to_string(),
                agent_id: None,
            },
        })?;
    Ok(Json(SessionDetail {
        status,
        tracked: dispatcher.sessions().get(&session_id),
    }))
}

pub(crate) async fn get_config(State(state): State<AppState>) -> Json<ConfigSummary> {
    Json(state.config().clone())
}
