//! API server entry point.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use api::config::{Config, LogFormat};
use store::{InMemoryStore, PgStore, Store};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How often expired sessions are swept from the token table.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn spawn_session_sweeper<S: Store>(state: &Arc<AppState<S>>) {
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "expired sessions purged");
            }
        }
    });
}

async fn serve<S: Store>(
    store: S,
    config: &Config,
    metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Result<(), Box<dyn Error>> {
    let state = api::create_state(store, config)?;
    spawn_session_sweeper(&state);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    tracing::info!(
        max_attempts = config.retry.max_attempts,
        backoff_ms = config.retry.backoff.as_millis() as u64,
        "retry policy configured"
    );

    match config.database_url.clone() {
        Some(url) => {
            let store = PgStore::connect(&url, config.max_connections).await?;
            store.run_migrations().await?;
            tracing::info!("connected to postgres, migrations applied");
            serve(store, &config, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            serve(InMemoryStore::new(), &config, metrics_handle).await
        }
    }
}
