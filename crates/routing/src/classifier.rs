//! Decides whether an event is a newly assigned issue worth acting on.

use crate::{EntityType, WebhookAction, WebhookEvent};

/// Why an event was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NonIssue,
    IgnoredAction,
    NotAssigned,
}

impl IgnoreReason {
    /// Reason string reported to the webhook sender.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonIssue => "non-issue webhook",
            Self::IgnoredAction => "ignored action",
            Self::NotAssigned => "not assigned",
        }
    }
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Process,
    Ignore(IgnoreReason),
}

impl Classification {
    pub fn should_process(self) -> bool {
        matches!(self, Self::Process)
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::Process => PROCESSING_REASON,
            Self::Ignore(reason) => reason.as_str(),
        }
    }
}

const PROCESSING_REASON: &str = "processing assigned issue";

/// Applies the assignment policy, short-circuiting on the first failed check:
/// Issue entity, then create/update action, then a non-empty assignee email.
pub fn classify(event: &WebhookEvent) -> Classification {
    if event.entity_type != EntityType::Issue {
        return Classification::Ignore(IgnoreReason::NonIssue);
    }
    if !matches!(event.action, WebhookAction::Create | WebhookAction::Update) {
        return Classification::Ignore(IgnoreReason::IgnoredAction);
    }
    if event.assignee_email().is_none() {
        return Classification::Ignore(IgnoreReason::NotAssigned);
    }
    Classification::Process
}

/// Tuple form of [`classify`]: `(should_process, reason)`.
pub fn should_process(event: &WebhookEvent) -> (bool, &'static str) {
    let outcome = classify(event);
    (outcome.should_process(), outcome.reason())
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::{EventPayload, Identity, IssueIdentifier, IssueId, IssuePayload};

    fn issue(email: Option<&str>) -> IssuePayload {
        IssuePayload {
            id: IssueId::new("issue-123").expect("id"),
            identifier: IssueIdentifier::new("TEAM-123").expect("identifier"),
            title: "Test Issue".into(),
            description: None,
            state: None,
            assignee: email.map(|e| Identity {
                id: "user-456".into(),
                display_name: "John Doe".into(),
                email: e.into(),
            }),
            creator: None,
            priority: None,
            labels: None,
            project: None,
            team: None,
            url: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn event(entity_type: EntityType, action: WebhookAction, payload: EventPayload) -> WebhookEvent {
        WebhookEvent {
            action,
            entity_type,
            payload,
            url: None,
            created_at: None,
            webhook_timestamp: None,
        }
    }

    #[test]
    fn assigned_issue_update_is_processed() {
        let ev = event(
            EntityType::Issue,
            WebhookAction::Update,
            EventPayload::Issue(issue(Some("john@example.com"))),
        );
        assert_eq!(should_process(&ev), (true, "processing assigned issue"));
    }

    #[test]
    fn non_issue_is_ignored_regardless_of_other_fields() {
        for kind in [
            EntityType::Comment,
            EntityType::Project,
            EntityType::Cycle,
            EntityType::Other("Reaction".into()),
        ] {
            for action in [WebhookAction::Create, WebhookAction::Remove] {
                let ev = event(kind.clone(), action, EventPayload::Opaque(Map::new()));
                assert_eq!(should_process(&ev), (false, "non-issue webhook"));
            }
        }
    }

    #[test]
    fn delete_and_remove_are_ignored() {
        for action in [
            WebhookAction::Delete,
            WebhookAction::Remove,
            WebhookAction::Other("archive".into()),
        ] {
            let ev = event(
                EntityType::Issue,
                action,
                EventPayload::Issue(issue(Some("john@example.com"))),
            );
            assert_eq!(should_process(&ev), (false, "ignored action"));
        }
    }

    #[test]
    fn unassigned_or_emailless_issues_are_ignored() {
        for assignee in [None, Some("")] {
            let ev = event(
                EntityType::Issue,
                WebhookAction::Create,
                EventPayload::Issue(issue(assignee)),
            );
            assert_eq!(classify(&ev), Classification::Ignore(IgnoreReason::NotAssigned));
        }
    }
}
