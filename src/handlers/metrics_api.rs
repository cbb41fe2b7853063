//! Time-ranged, paginated metric queries
//!
//! `GET /metrics/:limit/:offset` with a JSON body `{"start": <unix>, "end": <unix>}`.

use crate::error::{ApiResponse, AppError};
use crate::event_log::EventLogger;
use crate::storage::{Metric, MetricsDb};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Page size used when the path asks for a non-positive limit
pub const DEFAULT_LIMIT: i64 = 100;

/// Range used for a zero `start`
pub const DEFAULT_LOOKBACK_SECONDS: i64 = 24 * 60 * 60;

/// Shared state for the metrics API
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<MetricsDb>,
    pub event_log: Arc<EventLogger>,
    /// Upper bound for one store query
    pub query_timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsRequest {
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
}

/// Normalized query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsQuery {
    pub start: i64,
    pub end: i64,
    pub limit: i64,
    pub offset: i64,
}

impl MetricsQuery {
    /// Validate raw path segments and body against the current time `now`.
    pub fn parse(limit: &str, offset: &str, body: &[u8], now: i64) -> Result<Self, AppError> {
        let limit: i64 = limit
            .parse()
            .map_err(|e: std::num::ParseIntError| AppError::InvalidParameters(e.to_string()))?;
        let offset: i64 = offset
            .parse()
            .map_err(|e: std::num::ParseIntError| AppError::InvalidParameters(e.to_string()))?;

        let request: MetricsRequest = serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidRequestBody(e.to_string()))?;

        let start = if request.start == 0 {
            now - DEFAULT_LOOKBACK_SECONDS
        } else {
            request.start
        };
        let end = if request.end == 0 { now } else { request.end };

        if start > end {
            return Err(AppError::InvalidTimeRange { start, end });
        }

        Ok(Self {
            start,
            end,
            limit: if limit <= 0 { DEFAULT_LIMIT } else { limit },
            offset: offset.max(0),
        })
    }
}

/// GET /metrics/:limit/:offset
pub async fn get_metrics(
    State(state): State<AppState>,
    Path((limit, offset)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let now = chrono::Utc::now().timestamp();

    match fetch_metrics(&state, &limit, &offset, &body, now).await {
        Ok(metrics) => ApiResponse::ok(metrics).into_response(),
        Err(err) => {
            // Logging is best effort and never changes the response
            let _ = state.event_log.emit(err.log_level(), err.log_message()).await;
            err.into_response()
        }
    }
}

async fn fetch_metrics(
    state: &AppState,
    limit: &str,
    offset: &str,
    body: &[u8],
    now: i64,
) -> Result<Vec<Metric>, AppError> {
    let query = MetricsQuery::parse(limit, offset, body, now)?;

    let metrics = tokio::time::timeout(
        state.query_timeout,
        state
            .db
            .get_metrics(query.start, query.end, query.limit, query.offset),
    )
    .await
    .map_err(|_| AppError::RequestCancelled)??;

    if metrics.is_empty() {
        return Err(AppError::NoMetricsAvailable);
    }

    Ok(metrics)
}
