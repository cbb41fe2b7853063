use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    config::Config,
    event_log::{EventLogger, LogLevel},
    handlers::{self, metrics_api::AppState},
    metrics, request_log,
    signals::setup_signal_handlers,
    storage::MetricsDb,
};

/// Start the metrics service
///
/// This function:
/// 1. Starts the event log (fails fast if the log file cannot be opened)
/// 2. Opens the metrics database
/// 3. Serves requests until SIGINT/SIGTERM
/// 4. Drains the event log and closes the database
pub async fn start_server(config: Config) -> Result<()> {
    let event_log = Arc::new(EventLogger::new(config.event_log.clone()));
    event_log
        .init()
        .context("Failed to initialize event log")?;
    let _ = event_log.emit(LogLevel::Info, "Service started").await;

    let result = serve(&config, event_log.clone()).await;

    if let Err(e) = &result {
        let _ = event_log
            .emit(LogLevel::Error, format!("Service stopped with error: {:#}", e))
            .await;
    } else {
        let _ = event_log.emit(LogLevel::Info, "Service stopped").await;
    }

    if let Some(report) = event_log.shutdown().await {
        info!(
            written = report.written,
            filtered = report.filtered,
            failed = report.failed,
            "Event log drained"
        );
    }

    result
}

async fn serve(config: &Config, event_log: Arc<EventLogger>) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics()?);

    let db = Arc::new(MetricsDb::new(&config.database.url, config.database.max_connections).await?);

    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut deadline_rx = shutdown_tx.subscribe();

    let state = AppState {
        db: db.clone(),
        event_log,
        query_timeout: Duration::from_secs(config.server.request_timeout_seconds),
    };
    let app = create_router(state, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
        info!("Shutdown signal received, draining connections...");
    });

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    tokio::select! {
        result = server => result?,
        _ = async {
            let _ = deadline_rx.recv().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!("Graceful shutdown timed out after {:?}", shutdown_timeout);
        }
    }

    signal_handle.abort();
    db.close().await;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState, metrics_handle: Arc<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route(
            "/metrics/:limit/:offset",
            get(handlers::metrics_api::get_metrics),
        )
        .route_layer(middleware::from_fn_with_state(
            state.event_log.clone(),
            request_log::log_requests,
        ))
        .with_state(state);

    Router::new()
        .route("/prometheus", get(handlers::metrics_handler::prometheus))
        .with_state(metrics_handle)
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
}
