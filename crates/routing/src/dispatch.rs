//! Submission orchestration: prompt → agent API → session table.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::branch::branch_name;
use crate::prompt::{build_task_prompt, with_branch_instructions};
use crate::{
    AgentApi, AgentApiError, AgentId, AgentSession, BranchName, IssueSummary, Session, SessionId,
    SessionRequest, SessionStatus, SessionTracker, Timestamp,
};

/// Values applied to every submission unless overridden per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDefaults {
    /// Repository used when a submission names none. May be empty.
    pub repository: String,
    /// Target branch for the pull request the agent is asked to open.
    pub base_branch: String,
}

impl Default for SubmissionDefaults {
    fn default() -> Self {
        Self {
            repository: String::new(),
            base_branch: "develop".to_string(),
        }
    }
}

/// Outcome of [`AgentDispatcher::submit_task`].
#[derive(Debug, Clone)]
pub enum SubmissionResult {
    Submitted {
        session: AgentSession,
        agent_id: AgentId,
        issue: IssueSummary,
        branch: BranchName,
        repository: String,
    },
    /// The agent API call failed. Never retried here.
    Failed {
        error: AgentApiError,
        agent_id: AgentId,
        issue: IssueSummary,
    },
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
}

/// Owns the session table and the agent API handle.
///
/// The table is mutated only by [`AgentDispatcher::submit_task`]; everything
/// else reads copies.
pub struct AgentDispatcher {
    api: Arc<dyn AgentApi>,
    sessions: SessionTracker,
    defaults: SubmissionDefaults,
}

impl AgentDispatcher {
    pub fn new(api: Arc<dyn AgentApi>, sessions: SessionTracker, defaults: SubmissionDefaults) -> Self {
        info!(
            base_branch = %defaults.base_branch,
            repository_configured = !defaults.repository.is_empty(),
            "agent dispatcher initialised"
        );
        Self {
            api,
            sessions,
            defaults,
        }
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Submits one issue to `agent_id` and tracks the resulting session.
    ///
    /// `repo_url` overrides the configured default repository.
    #[instrument(skip_all, fields(agent = %agent_id, issue = %issue.identifier))]
    pub async fn submit_task(
        &self,
        agent_id: &AgentId,
        issue: &IssueSummary,
        repo_url: Option<&str>,
    ) -> SubmissionResult {
        let task_prompt = build_task_prompt(issue);
        let repository = repo_url
            .map(str::to_string)
            .unwrap_or_else(|| self.defaults.repository.clone());
        let branch = branch_name(&issue.identifier, &issue.title);
        let base_branch = self.defaults.base_branch.clone();

        let request = SessionRequest {
            agent_id: agent_id.clone(),
            repository: repository.clone(),
            prompt: with_branch_instructions(&task_prompt, &branch, &base_branch),
            task_prompt,
            branch: branch.clone(),
            base_branch: base_branch.clone(),
        };

        info!(branch = %branch, "submitting task to agent");
        match self.api.create_session(&request).await {
            Ok(session) => {
                self.sessions.record(Session {
                    session_id: session.session_id.clone(),
                    agent_id: agent_id.clone(),
                    issue: issue.clone(),
                    branch: branch.clone(),
                    base_branch,
                    repository: repository.clone(),
                    mode: session.mode,
                    created_at: Timestamp::now(),
                });
                info!(session_id = %session.session_id, mode = %session.mode, "task submitted");
                SubmissionResult::Submitted {
                    session,
                    agent_id: agent_id.clone(),
                    issue: issue.clone(),
                    branch,
                    repository,
                }
            }
            Err(err) => {
                error!(
                    error = %err,
                    retryable = err.retry_policy().is_retryable(),
                    "failed to submit task"
                );
                SubmissionResult::Failed {
                    error: err,
                    agent_id: agent_id.clone(),
                    issue: issue.clone(),
                }
            }
        }
    }

    /// Asks the agent API for the current status of a session.
    pub async fn check_session_status(&self, session_id: &SessionId) -> Result<SessionStatus, AgentApiError> {
        self.api.session_status(session_id).await
    }
}

impl std::fmt::Debug for AgentDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDispatcher")
            .field("sessions", &self.sessions.len())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{IssueId, IssueIdentifier, SessionMode};

    /// Records requests and answers with a fixed result.
    struct FakeApi {
        requests: Mutex<Vec<SessionRequest>>,
        fail_with: Option<AgentApiError>,
    }

    impl FakeApi {
        fn ok() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(err: AgentApiError) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail_with: Some(err),
            }
        }
    }

    #[async_trait]
    impl AgentApi for FakeApi {
        async fn create_session(&self, request: &SessionRequest) -> Result<AgentSession, AgentApiError> {
            self.requests.lock().expect("lock").push(request.clone());
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(AgentSession {
                    session_id: SessionId::new("sess_1").expect("id"),
                    status: "created".into(),
                    mode: SessionMode::Cloud,
                    url: Some("https://agents.test/sessions/sess_1".into()),
                    branch: None,
                }),
            }
        }

        async fn session_status(&self, session_id: &SessionId) -> Result<SessionStatus, AgentApiError> {
            Ok(SessionStatus {
                session_id: session_id.clone(),
                status: "running".into(),
                mode: SessionMode::Cloud,
                detail: None,
            })
        }
    }

    fn issue() -> IssueSummary {
        IssueSummary {
            id: IssueId::new("issue-123").expect("id"),
            identifier: IssueIdentifier::new("TEAM-123").expect("identifier"),
            title: "Fix: login bug!!".into(),
            description: None,
            assignee: Some("john@example.com".into()),
            url: None,
            priority: Some(1),
        }
    }

    fn agent() -> AgentId {
        AgentId::new("agent-john").expect("agent")
    }

    fn defaults() -> SubmissionDefaults {
        SubmissionDefaults {
            repository: "https://github.com/acme/app".into(),
            base_branch: "develop".into(),
        }
    }

    #[tokio::test]
    async fn successful_submission_is_tracked() {
        let api = Arc::new(FakeApi::ok());
        let dispatcher = AgentDispatcher::new(api.clone(), SessionTracker::new(), defaults());

        let result = dispatcher.submit_task(&agent(), &issue(), None).await;
        let SubmissionResult::Submitted { session, branch, .. } = result else {
            panic!("expected success");
        };
        assert_eq!(branch.as_str(), "linear/team-123-fix-login-bug");

        let tracked = dispatcher.sessions().get(&session.session_id).expect("tracked");
        assert_eq!(tracked.agent_id, agent());
        assert_eq!(tracked.issue.identifier.as_str(), "TEAM-123");
        assert_eq!(tracked.mode, SessionMode::Cloud);
        assert_eq!(tracked.repository, "https://github.com/acme/app");
    }

    #[tokio::test]
    async fn request_carries_prompt_with_branch_instructions() {
        let api = Arc::new(FakeApi::ok());
        let dispatcher = AgentDispatcher::new(api.clone(), SessionTracker::new(), defaults());
        dispatcher
            .submit_task(&agent(), &issue(), Some("https://github.com/acme/other"))
            .await;

        let requests = api.requests.lock().expect("lock");
        let request = &requests[0];
        assert_eq!(request.repository, "https://github.com/acme/other");
        assert!(request.task_prompt.starts_with("Task from Linear: TEAM-123"));
        assert!(request.prompt.starts_with(&request.task_prompt));
        assert!(request
            .prompt
            .ends_with("create a pull request targeting the 'develop' branch."));
    }

    #[tokio::test]
    async fn failure_is_reported_and_nothing_is_tracked() {
        let api = Arc::new(FakeApi::failing(AgentApiError::Status {
            status: 502,
            body: "bad gateway".into(),
            retry_after: None,
        }));
        let dispatcher = AgentDispatcher::new(api, SessionTracker::new(), defaults());

        let result = dispatcher.submit_task(&agent(), &issue(), None).await;
        assert!(!result.is_success());
        match result {
            SubmissionResult::Failed { error, agent_id, .. } => {
                assert_eq!(agent_id, agent());
                assert!(error.to_string().contains("502"));
            }
            SubmissionResult::Submitted { .. } => unreachable!(),
        }
        assert!(dispatcher.sessions().is_empty());
    }

    #[tokio::test]
    async fn status_is_delegated_to_the_api() {
        let dispatcher = AgentDispatcher::new(Arc::new(FakeApi::ok()), SessionTracker::new(), defaults());
        let status = dispatcher
            .check_session_status(&SessionId::new("sess_9").expect("id"))
            .await
            .expect("status");
        assert_eq!(status.status, "running");
    }
}
