//! Remote agent API client adapter.
//!
//! Implements the [`routing::AgentApi`] trait over the agent-execution HTTP
//! API:
//!
//! - `POST {base}/api/v1/sessions` starts a task (30 s timeout);
//! - `GET {base}/api/v1/sessions/{id}` reports its status (10 s timeout).
//!
//! Both calls carry the API key as a bearer token.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, serialisation, and status-code mapping
//! live here. The [`routing`] crate sees only [`routing::AgentApi`] and
//! [`routing::AgentApiError`].
//!
//! ## Local mode
//!
//! When the API is disabled or no key is configured, the client never touches
//! the network. Sessions are fabricated with a `local-` id derived from the
//! task prompt and report [`routing::SessionMode::Local`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use routing::{
    AgentApi, AgentApiError, AgentSession, SessionId, SessionMode, SessionRequest, SessionStatus,
    LOCAL_SESSION_PREFIX,
};

/// Default base URL of the remote agent API.
pub const DEFAULT_BASE_URL: &str = "https://app.kilo.ai";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`AgentApiClient`].
#[derive(Clone)]
pub struct AgentApiConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    pub api_key: Option<SecretString>,
    /// When `false` the client runs in local mode regardless of the key.
    pub enabled: bool,
    pub create_timeout: Duration,
    pub status_timeout: Duration,
}

impl AgentApiConfig {
    /// Cloud settings with the standard timeouts. Empty keys count as unset.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, enabled: bool) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(SecretString::new),
            enabled,
            create_timeout: Duration::from_secs(30),
            status_timeout: Duration::from_secs(10),
        }
    }

    /// Local-mode settings: no network calls are ever made.
    pub fn local() -> Self {
        Self::new(DEFAULT_BASE_URL, None, false)
    }
}

impl std::fmt::Debug for AgentApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("enabled", &self.enabled)
            .field("create_timeout", &self.create_timeout)
            .field("status_timeout", &self.status_timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP implementation of [`AgentApi`].
#[derive(Debug, Clone)]
pub struct AgentApiClient {
    http: reqwest::Client,
    config: AgentApiConfig,
}

#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

impl AgentApiClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// [`AgentApiError::Network`] when the underlying HTTP client cannot be
    /// constructed (for example, TLS initialisation failure).
    pub fn new(config: AgentApiConfig) -> Result<Self, AgentApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AgentApiError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        if !config.enabled {
            warn!("agent API disabled, tasks will be tracked locally");
        } else if config.api_key.is_none() {
            warn!("agent API enabled without an API key, tasks will be tracked locally");
        }
        Ok(Self { http, config })
    }

    /// `true` when no network calls will be made.
    pub fn is_local(&self) -> bool {
        self.api_key().is_none()
    }

    fn api_key(&self) -> Option<&str> {
        if !self.config.enabled {
            return None;
        }
        self.config.api_key.as_ref().map(|k| k.expose_secret().as_str())
    }

    fn sessions_url(&self) -> String {
        format!("{}/api/v1/sessions", self.config.base_url)
    }

    /// `{base}/api/v1/sessions/{id}` with the id percent-encoded as exactly
    /// one path segment.
    fn session_url(&self, session_id: &SessionId) -> Result<Url, AgentApiError> {
        let raw = session_id.as_str();
        if raw == "." || raw == ".." {
            return Err(AgentApiError::InvalidRequest {
                message: format!("session id '{raw}' is not a valid path segment"),
            });
        }
        let mut url = Url::parse(&self.sessions_url()).map_err(|e| AgentApiError::InvalidRequest {
            message: format!("invalid agent API base URL: {e}"),
        })?;
        url.path_segments_mut()
            .map_err(|()| AgentApiError::InvalidRequest {
                message: "agent API base URL cannot carry a path".into(),
            })?
            .push(raw);
        Ok(url)
    }
}

/// `local-` followed by the first 8 hex digits of SHA-256(`task_prompt`).
pub fn local_session_id(task_prompt: &str) -> String {
    let digest = hex::encode(Sha256::digest(task_prompt.as_bytes()));
    format!("{LOCAL_SESSION_PREFIX}{}", &digest[..8])
}

#[async_trait]
impl AgentApi for AgentApiClient {
    async fn create_session(&self, request: &SessionRequest) -> Result<AgentSession, AgentApiError> {
        let Some(api_key) = self.api_key() else {
            let session_id = SessionId::new(local_session_id(&request.task_prompt)).ok_or_else(|| {
                AgentApiError::Decode {
                    message: "empty local session id".into(),
                }
            })?;
            info!(
                repository = %request.repository,
                agent = %request.agent_id,
                branch = %request.branch,
                session_id = %session_id,
                "agent API disabled, returning local session"
            );
            return Ok(AgentSession {
                session_id,
                status: "queued".into(),
                mode: SessionMode::Local,
                url: None,
                branch: Some(request.branch.clone()),
            });
        };

        let response = self
            .http
            .post(self.sessions_url())
            .bearer_auth(api_key)
            .timeout(self.config.create_timeout)
            .json(&json!({
                "repository": request.repository,
                "prompt": request.prompt,
                "agent": request.agent_id.as_str(),
                "auto": true,
            }))
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        let created: CreatedSession = response.json().await.map_err(|e| AgentApiError::Decode {
            message: e.to_string(),
        })?;
        let session_id = SessionId::new(created.id).ok_or_else(|| AgentApiError::Decode {
            message: "response carried an empty session id".into(),
        })?;

        info!(
            session_id = %session_id,
            repository = %request.repository,
            agent = %request.agent_id,
            "cloud session created"
        );
        Ok(AgentSession {
            url: Some(format!("{}/sessions/{session_id}", self.config.base_url)),
            session_id,
            status: created.status.unwrap_or_else(|| "created".into()),
            mode: SessionMode::Cloud,
            branch: Some(request.branch.clone()),
        })
    }

    async fn session_status(&self, session_id: &SessionId) -> Result<SessionStatus, AgentApiError> {
        let api_key = match self.api_key() {
            Some(key) if !session_id.is_local() => key,
            _ => {
                return Ok(SessionStatus {
                    session_id: session_id.clone(),
                    status: "pending".into(),
                    mode: SessionMode::Local,
                    detail: None,
                })
            }
        };

        let url = self.session_url(session_id)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(api_key)
            .timeout(self.config.status_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let body: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentApiError::Decode {
                message: e.to_string(),
            })?;
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        Ok(SessionStatus {
            session_id: session_id.clone(),
            status,
            mode: SessionMode::Cloud,
            detail: Some(body),
        })
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn transport_error(err: reqwest::Error) -> AgentApiError {
    if err.is_timeout() {
        AgentApiError::Timeout {
            message: err.to_string(),
        }
    } else {
        AgentApiError::Network {
            message: err.to_string(),
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AgentApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), error = %body, "agent API request rejected");
    Err(AgentApiError::Status {
        status: status.as_u16(),
        body,
        retry_after,
    })
}

/// Reads `Retry-After` as delta-seconds or an HTTP date.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let retry_at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let delay = retry_at.signed_duration_since(Utc::now()).to_std().unwrap_or_default();
    Some(delay)
}
