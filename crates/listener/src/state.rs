//! Shared request context.

use std::sync::{Arc, OnceLock};

use routing::{AgentDispatcher, TaskRouter, WebhookVerifier};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::{ApiError, NotificationSender};

/// Name and version reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
}

/// Non-secret configuration reported by `/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub app_name: String,
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub kilo_cloud_enabled: bool,
    pub kilo_cloud_url: String,
    pub agent_mapping_count: usize,
    pub linear_configured: bool,
    pub webhook_auth_required: bool,
    pub webhook_bearer_configured: bool,
    pub webhook_secret_configured: bool,
    pub admin_auth_configured: bool,
}

/// The pipeline components. Installed once; requests arriving earlier get
/// `503`.
#[derive(Debug)]
pub struct Services {
    pub verifier: WebhookVerifier,
    pub router: TaskRouter,
    pub dispatcher: AgentDispatcher,
    pub notifications: NotificationSender,
}

struct Inner {
    info: ServiceInfo,
    admin_key: Option<SecretString>,
    config: ConfigSummary,
    services: OnceLock<Services>,
}

/// Cheaply cloneable handle passed to every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    /// State with no pipeline installed. Empty admin keys count as unset.
    pub fn new(info: ServiceInfo, admin_key: Option<String>, config: ConfigSummary) -> Self {
        Self {
            inner: Arc::new(Inner {
                info,
                admin_key: admin_key.filter(|k| !k.is_empty()).map(SecretString::new),
                config,
                services: OnceLock::new(),
            }),
        }
    }

    /// Installs the pipeline. Returns the services back if one is already
    /// installed.
    pub fn install(&self, services: Services) -> Result<(), Box<Services>> {
        self.inner.services.set(services).map_err(Box::new)
    }

    /// # Errors
    ///
    /// [`ApiError::NotInitialized`] until [`AppState::install`] succeeds.
    pub fn services(&self) -> Result<&Services, ApiError> {
        self.inner.services.get().ok_or(ApiError::NotInitialized)
    }

    pub fn info(&self) -> &ServiceInfo {
        &self.inner.info
    }

    pub fn config(&self) -> &ConfigSummary {
        &self.inner.config
    }

    pub(crate) fn admin_key(&self) -> Option<&str> {
        self.inner
            .admin_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("info", &self.inner.info)
            .field("admin_key", &self.inner.admin_key.is_some())
            .field("ready", &self.inner.services.get().is_some())
            .finish()
    }
}
