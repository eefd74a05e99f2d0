//! Linear webhook HTTP surface.
//!
//! Binds the [`routing`] pipeline to HTTP with `axum`:
//!
//! | Route | Auth | Purpose |
//! |-------|------|---------|
//! | `GET /health` | none | liveness |
//! | `GET /ready` | none | `503` until the pipeline is installed |
//! | `POST /webhook/linear` | bearer token and/or HMAC signature | receive tracker events |
//! | `GET /sessions` | admin key | list tracked sessions |
//! | `GET /sessions/{id}` | admin key | remote status plus tracked entry |
//! | `GET /config` | admin key | non-secret configuration summary |
//!
//! Each webhook delivery runs inside a `webhook` span carrying its delivery
//! id. Notifications are queued on a bounded channel and delivered by a
//! [`NotificationWorker`], so a slow or failing notifier never delays or fails
//! a webhook response.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request parsing, status codes, and response shapes live
//! here. Decisions are made by [`routing`].

use std::future::Future;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tracing::info;

mod admin;
mod error;
mod notify;
mod state;
mod webhook;

pub use error::ApiError;
pub use notify::{notification_channel, NotificationSender, NotificationWorker, DEFAULT_QUEUE_CAPACITY};
pub use state::{AppState, ConfigSummary, Services, ServiceInfo};

/// Header carrying the tracker's delivery id.
pub const DELIVERY_HEADER: &str = "linear-delivery";

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-api-key";

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let admin = Router::new()
        .route("/sessions", get(admin::list_sessions))
        .route("/sessions/{session_id}", get(admin::get_session))
        .route("/config", get(admin::get_config))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin_key,
        ));

    Router::new()
        .route("/health", get(webhook::health))
        .route("/ready", get(webhook::ready))
        .route("/webhook/linear", post(webhook::linear_webhook))
        .merge(admin)
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "webhook listener started");
    }
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("webhook listener stopped");
    Ok(())
}
