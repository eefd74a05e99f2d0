//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! an [`AgentId`] with a [`SessionId`] even though both are strings under the
//! hood.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// An identifier was given as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} must not be empty")]
pub struct EmptyIdentifier(&'static str);

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and a
// Deserialize that rejects the empty string.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(EmptyIdentifier(stringify!($name)))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: tracker-assigned
// ---------------------------------------------------------------------------

string_id! {
    /// Linear's internal identifier for an issue (a UUID string).
    IssueId
}

string_id! {
    /// Human-facing issue code such as `"TEAM-123"`.
    ///
    /// Immutable once the issue exists; used in prompts, branch names, and
    /// log context.
    IssueIdentifier
}

// ---------------------------------------------------------------------------
// Identifiers: agent side
// ---------------------------------------------------------------------------

string_id! {
    /// Opaque name of a remote agent (e.g. `"build"`, `"agent-john"`).
    AgentId
}

string_id! {
    /// Identifies one submitted task, either remote-assigned or a local
    /// pseudo-session id (`"local-…"`).
    SessionId
}

string_id! {
    /// A Git branch name (e.g. `"linear/team-123-fix-login-bug"`).
    BranchName
}

/// Prefix carried by every session id fabricated in local mode.
pub const LOCAL_SESSION_PREFIX: &str = "local-";

impl SessionId {
    /// Returns `true` if this id was fabricated in local mode.
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_SESSION_PREFIX)
    }
}

impl BranchName {
    /// Builds `linear/<identifier>-<slug>` with the identifier lower-cased.
    ///
    /// The tracker links pull requests to issues by spotting the identifier
    /// in the branch name.
    pub(crate) fn linked_to(identifier: &IssueIdentifier, slug: &str) -> Self {
        Self(format!("linear/{}-{slug}", identifier.as_str().to_lowercase()))
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed
// ---------------------------------------------------------------------------

/// Identifies one inbound webhook delivery.
///
/// Taken from the tracker's delivery header when it carries a valid UUID,
/// otherwise generated fresh. Propagated through spans so all activity for a
/// single delivery can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(Uuid);

impl DeliveryId {
    /// Generates a new random delivery identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a delivery header value, falling back to a random id when the
    /// header is absent or not a UUID.
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Self)
            .unwrap_or_else(Self::new_random)
    }
}

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
