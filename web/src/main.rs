//! Order confirmation service binary.
//!
//! Loads configuration, installs logging and metrics, and serves the webhook
//! router until Ctrl+C or SIGTERM.

use order_confirmation_core::environment::SystemClock;
use order_confirmation_runtime::coordinator::{JoinCoordinator, JoinEnvironment};
use order_confirmation_runtime::metrics::MetricsExporter;
use order_confirmation_runtime::notifier::HttpNotifier;
use order_confirmation_web::{AppState, ServiceConfig, build_router};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; variables may come from the environment
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "order_confirmation_web=info,order_confirmation_runtime=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment from file");
    }

    info!("Starting order confirmation service");

    let config = ServiceConfig::from_env()?;
    info!(
        address = %config.server.bind_address(),
        endpoint = %config.delivery.endpoint,
        timeout_ms = config.delivery.timeout.as_millis(),
        max_retries = config.delivery.retry.max_retries,
        duplicate_policy = ?config.duplicate_policy,
        "Configuration loaded"
    );

    let mut exporter = MetricsExporter::new();
    if config.server.metrics_enabled {
        exporter.install()?;
    }

    let notifier = HttpNotifier::new(config.delivery.endpoint.clone(), config.delivery.timeout)?;
    let coordinator = JoinCoordinator::new(JoinEnvironment {
        clock: Arc::new(SystemClock),
        notifier: Arc::new(notifier),
    })
    .with_retry_policy(config.delivery.retry.clone())
    .with_duplicate_policy(config.duplicate_policy);

    let state = AppState::new(coordinator).with_metrics(exporter.handle().cloned());
    let app = build_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
///
/// A handler that cannot be installed never fires; the other one still does.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
