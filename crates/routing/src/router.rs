//! Assignee → agent resolution.
//!
//! An [`AgentMapping`] maps routing keys to agent ids. A routing key is either
//! a literal email, an `"@domain"` string, or the literal `"default"`.
//! Resolution tries them in that order and the first hit wins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AgentId, IssueSummary, MappingError, WebhookEvent};

/// Routing key consulted when neither the email nor its domain matches.
pub const DEFAULT_ROUTING_KEY: &str = "default";

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Read-only routing table, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentMapping {
    entries: HashMap<String, AgentId>,
}

impl AgentMapping {
    /// Parses a JSON object of routing key → agent id.
    ///
    /// # Errors
    ///
    /// - [`MappingError::Invalid`] when the text is not an object of strings.
    /// - [`MappingError::EmptyAgent`] when any value is the empty string.
    pub fn from_json(raw: &str) -> Result<Self, MappingError> {
        let parsed: HashMap<String, String> =
            serde_json::from_str(raw).map_err(MappingError::Invalid)?;
        parsed
            .into_iter()
            .map(|(key, agent)| match AgentId::new(agent) {
                Some(agent) => Ok((key, agent)),
                None => Err(MappingError::EmptyAgent { key }),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves an assignee email, reporting which tier matched.
    pub fn resolve(&self, email: &str) -> Option<(&AgentId, RoutingMethod)> {
        if let Some(agent) = self.entries.get(email) {
            return Some((agent, RoutingMethod::EmailDirect));
        }
        if let Some(agent) = self.entries.get(&domain_key(email)) {
            return Some((agent, RoutingMethod::DomainMatch));
        }
        self.entries
            .get(DEFAULT_ROUTING_KEY)
            .map(|agent| (agent, RoutingMethod::DefaultFallback))
    }
}

impl FromIterator<(String, AgentId)> for AgentMapping {
    fn from_iter<I: IntoIterator<Item = (String, AgentId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// `"@"` followed by everything after the last `@`. An address with no `@`
/// yields `"@<address>"`.
fn domain_key(email: &str) -> String {
    let domain = email.rsplit('@').next().unwrap_or(email);
    format!("@{domain}")
}

/// Returns the agent for `email`, or `None` when no tier matches.
pub fn resolve_agent(email: &str, mapping: &AgentMapping) -> Option<AgentId> {
    mapping.resolve(email).map(|(agent, _)| agent.clone())
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Which resolution tier produced the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMethod {
    EmailDirect,
    DomainMatch,
    DefaultFallback,
}

impl std::fmt::Display for RoutingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::EmailDirect => "email_direct",
            Self::DomainMatch => "domain_match",
            Self::DefaultFallback => "default_fallback",
        })
    }
}

/// A successful routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub agent_id: AgentId,
    pub assignee_email: String,
    pub issue: IssueSummary,
    pub method: RoutingMethod,
}

/// Outcome of [`TaskRouter::route`]. Produced fresh per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    Routed(Route),
    NotRouted {
        reason: String,
        assignee_email: Option<String>,
    },
}

impl RoutingDecision {
    pub fn is_routed(&self) -> bool {
        matches!(self, Self::Routed(_))
    }

    pub fn reason(&self) -> String {
        match self {
            Self::Routed(route) => format!("routed to {} via {}", route.agent_id, route.method),
            Self::NotRouted { reason, .. } => reason.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Applies an [`AgentMapping`] to classified events.
#[derive(Debug, Clone)]
pub struct TaskRouter {
    mapping: AgentMapping,
}

impl TaskRouter {
    pub fn new(mapping: AgentMapping) -> Self {
        info!(mappings = mapping.len(), "task router initialised");
        Self { mapping }
    }

    /// Decides which agent should receive the event's issue.
    pub fn route(&self, event: &WebhookEvent) -> RoutingDecision {
        let (Some(issue), Some(email)) = (event.issue(), event.assignee_email()) else {
            warn!("cannot route: no assignee email");
            return RoutingDecision::NotRouted {
                reason: "no assignee email".to_string(),
                assignee_email: None,
            };
        };

        let Some((agent, method)) = self.mapping.resolve(email) else {
            warn!(email, "no agent mapping for assignee");
            return RoutingDecision::NotRouted {
                reason: format!("no agent mapping for {email}"),
                assignee_email: Some(email.to_string()),
            };
        };

        info!(
            assignee = email,
            agent = %agent,
            issue = %issue.identifier,
            method = %method,
            "task routed to agent"
        );
        RoutingDecision::Routed(Route {
            agent_id: agent.clone(),
            assignee_email: email.to_string(),
            issue: issue.summary(),
            method,
        })
    }
}
