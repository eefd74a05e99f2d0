//! Webhook endpoint plus liveness and readiness probes.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::Json;
use routing::verifier::SIGNATURE_HEADER;
use routing::{classify, parse_event, DeliveryId, Notification, RoutingDecision, SubmissionResult};
use serde_json::{json, Value};
use tracing::{error, info, info_span, warn, Instrument};

use crate::{ApiError, AppState, DELIVERY_HEADER};

type JsonReply = (StatusCode, Json<Value>);

pub(crate) async fn health(State(state): State<AppState>) -> Json<Value> {
    let info = state.info();
    Json(json!({
        "status": "healthy",
        "service": info.service,
        "version": info.version,
    }))
}

pub(crate) async fn ready(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.services()?;
    Ok(Json(json!({
        "status": "ready",
        "handlers": {"webhook": true, "router": true, "agent": true},
    })))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `POST /webhook/linear`.
pub(crate) async fn linear_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<JsonReply, ApiError> {
    let delivery = DeliveryId::from_header(header(&headers, DELIVERY_HEADER));
    let span = info_span!("webhook", delivery_id = %delivery);
    handle_delivery(state, headers, body).instrument(span).await
}

async fn handle_delivery(state: AppState, headers: HeaderMap, body: Bytes) -> Result<JsonReply, ApiError> {
    let services = state.services()?;

    if !services.verifier.check_bearer(header(&headers, AUTHORIZATION.as_str())) {
        warn!("bearer token verification failed");
        return Err(ApiError::Unauthorized("Invalid or missing bearer token"));
    }
    if !services
        .verifier
        .check_signature(&body, header(&headers, SIGNATURE_HEADER))
    {
        warn!("webhook signature verification failed");
        return Err(ApiError::Unauthorized("Invalid signature"));
    }

    let event = parse_event(&body).map_err(|err| {
        error!(error = %err, "invalid webhook payload");
        ApiError::MalformedInput(err.to_string())
    })?;

    let classification = classify(&event);
    if !classification.should_process() {
        info!(
            entity_type = %event.entity_type,
            action = %event.action,
            reason = classification.reason(),
            "webhook ignored"
        );
        return Ok(reply(
            StatusCode::OK,
            json!({"status": "ignored", "reason": classification.reason()}),
        ));
    }

    let route = match services.router.route(&event) {
        RoutingDecision::Routed(route) => route,
        not_routed @ RoutingDecision::NotRouted { .. } => {
            let reason = not_routed.reason();
            warn!(%reason, "task routing failed");
            return Ok(reply(
                StatusCode::OK,
                json!({"status": "not_routed", "reason": reason}),
            ));
        }
    };

    match services
        .dispatcher
        .submit_task(&route.agent_id, &route.issue, None)
        .await
    {
        SubmissionResult::Submitted {
            session,
            agent_id,
            issue,
            branch,
            repository,
        } => {
            info!(session_id = %session.session_id, agent = %agent_id, "task submitted to agent");
            let body = json!({
                "status": "routed",
                "agent_id": agent_id,
                "routing_method": route.method,
                "session": session,
                "issue": issue,
                "branch": branch,
            });
            services.notifications.send(Notification::IssueAssigned {
                issue,
                agent_id,
                branch: Some(branch),
                repository: Some(repository).filter(|r| !r.is_empty()),
            });
            Ok(reply(StatusCode::ACCEPTED, body))
        }
        SubmissionResult::Failed {
            error,
            agent_id,
            issue,
        } => {
            error!(error = %error, agent = %agent_id, "failed to submit task to agent");
            services.notifications.send(Notification::SubmissionFailed {
                identifier: issue.identifier,
                agent_id: agent_id.clone(),
                error: error.to_string(),
            });
            Err(ApiError::Upstream {
                error: error.to_string(),
                agent_id: Some(agent_id),
            })
        }
    }
}

fn reply(status: StatusCode, body: Value) -> JsonReply {
    (status, Json(body))
}
