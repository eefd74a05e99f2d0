//! Startup configuration.
//!
//! Every setting is read once, from a long flag or its environment variable
//! (after `.env` has been loaded), and handed to the components explicitly.
//! Empty secrets count as unset.

use std::num::NonZeroUsize;

use agent_api::AgentApiConfig;
use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use listener::{ConfigSummary, ServiceInfo};
use routing::{AgentMapping, SessionTracker, SubmissionDefaults, WebhookVerifier};
use telegram::TelegramConfig;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "linear-relay",
    version,
    about = "Routes assigned Linear issues to remote coding agents"
)]
pub struct Settings {
    #[arg(long, env = "APP_NAME", default_value = "Linear Kilo Webhook")]
    pub app_name: String,

    #[arg(
        long,
        env = "DEBUG",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
        help = "Human-readable logs at debug level"
    )]
    pub debug: bool,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    #[arg(long, env = "LINEAR_API_KEY", hide_env_values = true)]
    pub linear_api_key: Option<String>,

    #[arg(
        long,
        env = "LINEAR_WEBHOOK_SECRET",
        hide_env_values = true,
        help = "HMAC secret for the linear-signature header; unset skips signature checks"
    )]
    pub linear_webhook_secret: Option<String>,

    #[arg(long, env = "WEBHOOK_BEARER_TOKEN", hide_env_values = true)]
    pub webhook_bearer_token: Option<String>,

    #[arg(
        long,
        env = "WEBHOOK_AUTH_REQUIRED",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub webhook_auth_required: bool,

    #[arg(
        long,
        env = "ADMIN_API_KEY",
        hide_env_values = true,
        help = "Key expected in X-API-Key on admin routes; unset leaves them open"
    )]
    pub admin_api_key: Option<String>,

    #[arg(long, env = "KILO_API_KEY", hide_env_values = true)]
    pub kilo_api_key: Option<String>,

    #[arg(
        long,
        env = "KILO_CLOUD_ENABLED",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
        help = "Submit to the remote agent API instead of tracking tasks locally"
    )]
    pub kilo_cloud_enabled: bool,

    #[arg(long, env = "KILO_CLOUD_URL", default_value = agent_api::DEFAULT_BASE_URL)]
    pub kilo_cloud_url: String,

    #[arg(
        long,
        env = "AGENT_MAPPING",
        default_value = "{}",
        help = "JSON object mapping an email, \"@domain\", or \"default\" to an agent id"
    )]
    pub agent_mapping: String,

    #[arg(long, env = "DEFAULT_REPO_URL", default_value = "")]
    pub default_repo_url: String,

    #[arg(long, env = "DEFAULT_BASE_BRANCH", default_value = "develop")]
    pub default_base_branch: String,

    #[arg(
        long,
        env = "SESSION_RETENTION_LIMIT",
        help = "Keep at most this many sessions; unset keeps all"
    )]
    pub session_retention_limit: Option<NonZeroUsize>,

    #[arg(
        long,
        env = "TELEGRAM_NOTIFICATIONS_ENABLED",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub telegram_notifications_enabled: bool,

    #[arg(long, env = "NOTIFICATION_USER_ID", default_value = telegram::DEFAULT_CHAT_ID)]
    pub notification_user_id: String,

    #[arg(
        long,
        env = "TELEGRAM_BOT_TOKEN",
        hide_env_values = true,
        help = "Deliver notifications through the Bot API; unset only logs them"
    )]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_API_BASE", default_value = telegram::DEFAULT_API_BASE)]
    pub telegram_api_base: String,

    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// Rejects combinations that cannot work.
    ///
    /// # Errors
    ///
    /// Fails when bearer auth is required but no token is configured, or when
    /// the agent mapping does not parse.
    pub fn validate(&self) -> Result<AgentMapping> {
        if self.webhook_auth_required && non_empty(&self.webhook_bearer_token).is_none() {
            bail!("WEBHOOK_AUTH_REQUIRED is set but WEBHOOK_BEARER_TOKEN is empty");
        }
        self.agent_mapping()
    }

    pub fn agent_mapping(&self) -> Result<AgentMapping> {
        AgentMapping::from_json(&self.agent_mapping).context("invalid AGENT_MAPPING")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn admin_key(&self) -> Option<String> {
        non_empty(&self.admin_api_key)
    }

    pub fn verifier(&self) -> WebhookVerifier {
        WebhookVerifier::new(
            non_empty(&self.linear_webhook_secret),
            non_empty(&self.webhook_bearer_token),
        )
    }

    pub fn agent_api_config(&self) -> AgentApiConfig {
        AgentApiConfig::new(
            self.kilo_cloud_url.clone(),
            non_empty(&self.kilo_api_key),
            self.kilo_cloud_enabled,
        )
    }

    pub fn telegram_config(&self) -> TelegramConfig {
        TelegramConfig::new(
            self.telegram_notifications_enabled,
            self.notification_user_id.clone(),
            non_empty(&self.telegram_bot_token),
            self.telegram_api_base.clone(),
        )
    }

    pub fn submission_defaults(&self) -> SubmissionDefaults {
        SubmissionDefaults {
            repository: self.default_repo_url.clone(),
            base_branch: self.default_base_branch.clone(),
        }
    }

    pub fn session_tracker(&self) -> SessionTracker {
        match self.session_retention_limit {
            Some(limit) => SessionTracker::with_retention(limit),
            None => SessionTracker::new(),
        }
    }

    pub fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            service: self.app_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn config_summary(&self, agent_mapping_count: usize) -> ConfigSummary {
        ConfigSummary {
            app_name: self.app_name.clone(),
            debug: self.debug,
            host: self.host.clone(),
            port: self.port,
            kilo_cloud_enabled: self.kilo_cloud_enabled,
            kilo_cloud_url: self.kilo_cloud_url.clone(),
            agent_mapping_count,
            linear_configured: non_empty(&self.linear_api_key).is_some(),
            webhook_auth_required: self.webhook_auth_required,
            webhook_bearer_configured: non_empty(&self.webhook_bearer_token).is_some(),
            webhook_secret_configured: non_empty(&self.linear_webhook_secret).is_some(),
            admin_auth_configured: self.admin_key().is_some(),
        }
    }
}
