//! Core relay domain for Linear → agent routing.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and error type used between the webhook listener and the remote
//! agent API. Infrastructure crates implement the traits defined here; they
//! never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no network or file
//! I/O. It defines *what* is needed; infrastructure crates define *how* to
//! supply it.
//!
//! ## Pipeline
//!
//! raw bytes → [`verifier`] → [`normalizer`] → [`classifier`] → [`router`]
//! → [`dispatch`] (agent API, [`sessions`]) → [`Notifier`]
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`IssueIdentifier`, `AgentId`, `SessionId`, etc.) |
//! | [`types`] | Webhook event model, issue payload, `Timestamp` |
//! | [`errors`] | Error and retry-policy types |
//! | [`verifier`] | HMAC signature and bearer token checks |
//! | [`normalizer`] | Raw bytes → `WebhookEvent` |
//! | [`classifier`] | Is this a newly assigned issue? |
//! | [`router`] | Agent mapping and routing decisions |
//! | [`branch`] | Branch naming |
//! | [`prompt`] | Task prompt text |
//! | [`sessions`] | In-memory session table |
//! | [`dispatch`] | Submission orchestration |
//! | [`ports`] | `AgentApi` and `Notifier` traits |

pub mod branch;
pub mod classifier;
pub mod dispatch;
pub mod errors;
pub mod identifiers;
pub mod normalizer;
pub mod ports;
pub mod prompt;
pub mod router;
pub mod sessions;
pub mod types;
pub mod verifier;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use branch::{branch_name, slugify};
pub use classifier::{classify, should_process, Classification, IgnoreReason};
pub use dispatch::{AgentDispatcher, SubmissionDefaults, SubmissionResult};
pub use errors::{AgentApiError, MappingError, NotifyError, PayloadError, RetryPolicy};
pub use identifiers::{
    AgentId, BranchName, DeliveryId, EmptyIdentifier, IssueId, IssueIdentifier, SessionId,
    LOCAL_SESSION_PREFIX,
};
pub use normalizer::parse_event;
pub use ports::{AgentApi, AgentSession, Notification, Notifier, SessionRequest, SessionStatus};
pub use prompt::{build_task_prompt, with_branch_instructions};
pub use router::{resolve_agent, AgentMapping, Route, RoutingDecision, RoutingMethod, TaskRouter};
pub use sessions::{Session, SessionTracker};
pub use types::{
    EntityType, EventPayload, Identity, IssuePayload, IssueSummary, SessionMode, Timestamp,
    WebhookAction, WebhookEvent,
};
pub use verifier::{verify_bearer_token, verify_signature, WebhookVerifier};
