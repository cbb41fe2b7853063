pub mod config;
pub mod error;
pub mod event_log;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod request_log;
pub mod server;
pub mod signals;
pub mod storage;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging for console diagnostics
///
/// Note: This function can only be called once. The service's own request and
/// error log goes through [`event_log::EventLogger`], not through tracing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
