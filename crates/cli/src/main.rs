//! Linear relay entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load `.env`, then flags and environment
//!    variables into [`config::Settings`], and validate them.
//! 2. **Wire observability**: JSON or console logs plus optional OTLP export.
//! 3. **Construct infrastructure**: the agent API client, the Telegram
//!    notifier, and the notification worker, injected into the listener's
//!    [`listener::AppState`].
//! 4. **Serve** until `SIGINT`/`SIGTERM`, then drain notifications and flush
//!    spans.

use std::sync::Arc;
use std::time::Duration;

use agent_api::AgentApiClient;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use listener::{app, notification_channel, AppState, Services, DEFAULT_QUEUE_CAPACITY};
use routing::{AgentDispatcher, TaskRouter};
use telegram::TelegramNotifier;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

mod config;
mod telemetry;

use config::Settings;

/// How long queued notifications may take to drain after shutdown.
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal in production.
    dotenvy::dotenv().ok();
    let settings = Settings::parse();
    let telemetry = telemetry::init(&settings)?;

    let result = run(settings).await;
    if let Err(err) = &result {
        error!(error = %format_args!("{err:#}"), "linear relay stopped with an error");
    }
    telemetry.shutdown();
    result
}

async fn run(settings: Settings) -> Result<()> {
    let mapping = settings.validate()?;
    info!(
        app_name = %settings.app_name,
        debug = settings.debug,
        mappings = mapping.len(),
        cloud = settings.kilo_cloud_enabled,
        "starting linear relay"
    );
    if mapping.is_empty() {
        warn!("AGENT_MAPPING is empty, assigned issues will not be routed");
    }

    let state = AppState::new(
        settings.service_info(),
        settings.admin_key(),
        settings.config_summary(mapping.len()),
    );

    let agent_api =
        AgentApiClient::new(settings.agent_api_config()).context("building agent API client")?;
    let notifier =
        TelegramNotifier::new(settings.telegram_config()).context("building Telegram notifier")?;

    let (notifications, worker) = notification_channel(DEFAULT_QUEUE_CAPACITY);
    let worker = tokio::spawn(worker.run(Arc::new(notifier)));

    state
        .install(Services {
            verifier: settings.verifier(),
            router: TaskRouter::new(mapping),
            dispatcher: AgentDispatcher::new(
                Arc::new(agent_api),
                settings.session_tracker(),
                settings.submission_defaults(),
            ),
            notifications,
        })
        .map_err(|_| anyhow!("pipeline installed twice"))?;
    info!("service initialised and ready");

    let addr = settings.bind_address();
    let tcp = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    // The router owns the last notification sender; dropping it on return
    // lets the worker drain and exit.
    listener::serve(tcp, app(state), shutdown_signal())
        .await
        .context("serving HTTP")?;

    match tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => info!("notification worker drained"),
        Ok(Err(err)) => warn!(error = %err, "notification worker panicked"),
        Err(_) => warn!("notification worker did not drain in time"),
    }
    info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}
