//! Telegram notification adapter.
//!
//! Implements the [`routing::Notifier`] trait. Every [`Notification`] is
//! rendered into a short Markdown message for a single configured chat.
//!
//! ## Delivery
//!
//! | Configuration | Behaviour |
//! |---------------|-----------|
//! | disabled | no-op |
//! | enabled, no bot token | message is logged for an external dispatcher |
//! | enabled, bot token | `POST {api_base}/bot{token}/sendMessage` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Message text and the Bot API call live here; the
//! listener only hands notifications over.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use routing::{Notification, Notifier, NotifyError};

/// Default Bot API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Default chat receiving notifications.
pub const DEFAULT_CHAT_ID: &str = "9504807";

/// Upper bound on one Bot API call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub chat_id: String,
    pub bot_token: Option<SecretString>,
    /// Bot API base URL, without a trailing slash.
    pub api_base: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    /// Empty tokens count as unset.
    pub fn new(
        enabled: bool,
        chat_id: impl Into<String>,
        bot_token: Option<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            enabled,
            chat_id: chat_id.into(),
            bot_token: bot_token.filter(|t| !t.is_empty()).map(SecretString::new),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self::new(true, DEFAULT_CHAT_ID, None, DEFAULT_API_BASE)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("enabled", &self.enabled)
            .field("chat_id", &self.chat_id)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Message text
// ---------------------------------------------------------------------------

/// Renders a notification as Telegram Markdown.
pub fn format_message(notification: &Notification) -> String {
    match notification {
        Notification::IssueAssigned {
            issue,
            agent_id,
            branch,
            repository,
        } => {
            let assignee = issue.assignee.as_deref().unwrap_or("Unknown");
            let mut message = format!(
                "🎯 *New task from Linear*\n\n\
                 📋 *Issue:* {}\n\
                 📝 *Title:* {}\n\
                 👤 *Assigned to:* {}\n\
                 🤖 *Agent:* {}",
                escape_markdown(issue.identifier.as_str()),
                escape_markdown(&issue.title),
                escape_markdown(assignee),
                escape_markdown(agent_id.as_str()),
            );
            if let Some(name) = repository.as_deref().and_then(repository_name) {
                message.push_str(&format!("\n📁 *Repository:* {}", escape_markdown(name)));
            }
            if let Some(branch) = branch {
                message.push_str(&format!("\n🌿 *Branch:* `{branch}`"));
            }
            message.push_str("\n\n⏳ Starting the agent and processing the task...");
            message
        }
        Notification::SubmissionFailed {
            identifier,
            agent_id,
            error,
        } => format!(
            "⚠️ *Processing error*\n\n\
             📋 *Issue:* {}\n\
             🤖 *Agent:* {}\n\
             ❌ *Error:* {}\n\n\
             The task could not be handed to the agent.",
            escape_markdown(identifier.as_str()),
            escape_markdown(agent_id.as_str()),
            escape_markdown(error),
        ),
    }
}

/// Backslash-escapes the characters that open an entity in Telegram's
/// legacy Markdown: `_`, `*`, `` ` `` and `[`.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Last path segment of a repository URL.
fn repository_name(repository: &str) -> Option<&str> {
    repository
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Bot API implementation of [`Notifier`].
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    config: TelegramConfig,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    /// # Errors
    ///
    /// [`NotifyError::Delivery`] when the HTTP client cannot be constructed.
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| NotifyError::Delivery {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if !self.config.enabled {
            debug!("telegram notifications disabled");
            return Ok(());
        }

        let text = format_message(notification);
        let Some(token) = &self.config.bot_token else {
            info!(
                chat_id = %self.config.chat_id,
                issue = %notification.identifier(),
                message = %text,
                "telegram notification ready for dispatch"
            );
            return Ok(());
        };

        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base,
            token.expose_secret()
        );
        let response = self
            .http
            .post(url)
            .timeout(self.config.timeout)
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            // reqwest errors embed the URL, which carries the token.
            .map_err(|e| NotifyError::Delivery {
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body: Option<BotApiResponse> = response.json().await.ok();
        match body {
            Some(BotApiResponse { ok: true, .. }) if status.is_success() => {
                info!(issue = %notification.identifier(), "telegram notification sent");
                Ok(())
            }
            other => {
                let description = other
                    .and_then(|b| b.description)
                    .unwrap_or_else(|| "no description".to_string());
                warn!(status = status.as_u16(), %description, "telegram rejected notification");
                Err(NotifyError::Delivery {
                    message: format!("HTTP {}: {description}", status.as_u16()),
                })
            }
        }
    }
}
