//! Port traits implemented by the infrastructure crates.
//!
//! The domain never talks to the network. It describes what it needs from the
//! remote agent API ([`AgentApi`]) and from the notification channel
//! ([`Notifier`]); `agent-api` and `telegram` supply the implementations and
//! the composition root wires them in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    AgentApiError, AgentId, BranchName, IssueIdentifier, IssueSummary, NotifyError, SessionId,
    SessionMode,
};

// ---------------------------------------------------------------------------
// Remote agent API
// ---------------------------------------------------------------------------

/// Everything an [`AgentApi`] needs to start one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub agent_id: AgentId,
    /// Repository URL handed to the agent. May be empty when no default is
    /// configured.
    pub repository: String,
    /// The deterministic task prompt built from the issue.
    ///
    /// Local mode derives the pseudo-session id from this text.
    pub task_prompt: String,
    /// The prompt actually sent: the task prompt plus branch and pull
    /// request instructions.
    pub prompt: String,
    pub branch: BranchName,
    pub base_branch: String,
}

/// A session created by [`AgentApi::create_session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSession {
    pub session_id: SessionId,
    pub status: String,
    pub mode: SessionMode,
    /// Dashboard URL for cloud sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchName>,
}

/// Answer to [`AgentApi::session_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub status: String,
    pub mode: SessionMode,
    /// The remote API's full response body, for cloud sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// The remote agent-execution API.
///
/// Implementations bound every call with their own timeout and surface it as
/// [`AgentApiError::Timeout`]. They never retry.
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Starts a task. Local-mode implementations fabricate a session without
    /// any network call and report [`SessionMode::Local`].
    async fn create_session(&self, request: &SessionRequest) -> Result<AgentSession, AgentApiError>;

    /// Looks up the status of a session. Local pseudo-sessions answer
    /// `pending` without a network call.
    async fn session_status(&self, session_id: &SessionId) -> Result<SessionStatus, AgentApiError>;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A one-way, best-effort status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A task was submitted to an agent.
    IssueAssigned {
        issue: IssueSummary,
        agent_id: AgentId,
        branch: Option<BranchName>,
        repository: Option<String>,
    },
    /// Submission to the agent API failed.
    SubmissionFailed {
        identifier: IssueIdentifier,
        agent_id: AgentId,
        error: String,
    },
}

impl Notification {
    /// The issue the notification is about, for log context.
    pub fn identifier(&self) -> &IssueIdentifier {
        match self {
            Self::IssueAssigned { issue, .. } => &issue.identifier,
            Self::SubmissionFailed { identifier, .. } => identifier,
        }
    }
}

/// A messaging channel for human-readable status updates.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification. Errors are reported to the caller, which
    /// logs them; they never affect the routing outcome.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}
