//! Shared value types for the relay domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! structured data: the normalised webhook event, the issue payload it wraps,
//! and the summary that flows on to prompts, sessions, and notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{IssueId, IssueIdentifier};

// ---------------------------------------------------------------------------
// Event envelope
// ---------------------------------------------------------------------------

/// Entity kind named by the webhook's `type` field.
///
/// Unknown kinds are preserved in [`EntityType::Other`] so that new tracker
/// entity types never fail parsing; they are simply never routed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    Issue,
    Comment,
    Project,
    Cycle,
    Other(String),
}

impl EntityType {
    /// Maps the wire value onto a known kind.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "Issue" => Self::Issue,
            "Comment" => Self::Comment,
            "Project" => Self::Project,
            "Cycle" => Self::Cycle,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Issue => "Issue",
            Self::Comment => "Comment",
            Self::Project => "Project",
            Self::Cycle => "Cycle",
            Self::Other(other) => other,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Webhook action named by the `action` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookAction {
    Create,
    Update,
    Delete,
    Remove,
    Other(String),
}

impl WebhookAction {
    /// Maps the wire value onto a known action.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "remove" => Self::Remove,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Remove => "remove",
            Self::Other(other) => other,
        }
    }
}

impl std::fmt::Display for WebhookAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `data` member of a webhook, discriminated by [`EntityType`].
///
/// Issue events are parsed strictly into [`IssuePayload`]; every other entity
/// type keeps its data as an opaque JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Issue(IssuePayload),
    Opaque(Map<String, Value>),
}

/// A normalised inbound webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub action: WebhookAction,
    pub entity_type: EntityType,
    pub payload: EventPayload,
    /// URL of the changed entity, when the tracker includes one.
    pub url: Option<String>,
    pub created_at: Option<Timestamp>,
    /// Milliseconds since the epoch at which the tracker sent the delivery.
    pub webhook_timestamp: Option<i64>,
}

impl WebhookEvent {
    /// Returns the issue payload for Issue events.
    pub fn issue(&self) -> Option<&IssuePayload> {
        match &self.payload {
            EventPayload::Issue(issue) => Some(issue),
            EventPayload::Opaque(_) => None,
        }
    }

    /// Returns the assignee email when the event carries a non-empty one.
    pub fn assignee_email(&self) -> Option<&str> {
        self.issue()
            .and_then(|issue| issue.assignee.as_ref())
            .map(|assignee| assignee.email.as_str())
            .filter(|email| !email.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Issue data
// ---------------------------------------------------------------------------

/// A tracker user. The email is the routing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

/// Issue data carried by `type = "Issue"` webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePayload {
    pub id: IssueId,
    pub identifier: IssueIdentifier,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<Map<String, Value>>,
    #[serde(default)]
    pub assignee: Option<Identity>,
    #[serde(default)]
    pub creator: Option<Identity>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub labels: Option<Vec<Value>>,
    #[serde(default)]
    pub project: Option<Map<String, Value>>,
    #[serde(default)]
    pub team: Option<Map<String, Value>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl IssuePayload {
    /// Projects the fields that flow into prompts, sessions, and notifications.
    pub fn summary(&self) -> IssueSummary {
        IssueSummary {
            id: self.id.clone(),
            identifier: self.identifier.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            assignee: self.assignee.as_ref().map(|a| a.email.clone()),
            url: self.url.clone(),
            priority: self.priority,
        }
    }
}

/// The subset of an issue that is submitted to an agent and tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub id: IssueId,
    pub identifier: IssueIdentifier,
    pub title: String,
    pub description: Option<String>,
    /// Assignee email.
    pub assignee: Option<String>,
    pub url: Option<String>,
    pub priority: Option<i64>,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Whether a session was created by the remote agent API or fabricated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// No network call was made; the session id is a local pseudo-id.
    Local,
    /// The remote agent API accepted the task.
    Cloud,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Cloud => f.write_str("cloud"),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
