//! Per-request middleware: one INFO event-log line and Prometheus counters.

use crate::event_log::{EventLogger, LogLevel};
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

pub async fn log_requests(
    State(event_log): State<Arc<EventLogger>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let _ = event_log
        .emit(LogLevel::Info, format!("Request: {} {}", method, uri))
        .await;

    let started = Instant::now();
    let response = next.run(request).await;

    crate::metrics::record_request(
        method.as_str(),
        &route,
        response.status().as_u16(),
        started.elapsed(),
    );

    response
}
