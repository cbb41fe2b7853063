use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::event_log::LogLevel;

/// Numeric codes carried in every API response envelope.
pub mod codes {
    pub const API_SUCCESS: u32 = 303000;
    pub const API_FAILURE: u32 = 303001;

    pub const METRICS_NOT_AVAILABLE: u32 = 101;
    pub const INVALID_REQUEST_BODY: u32 = 102;
    pub const INVALID_PARAMETERS: u32 = 103;
    pub const INVALID_TIME_RANGE: u32 = 104;
    pub const REQUEST_CANCELLED: u32 = 105;
}

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// No samples matched the query
    NoMetricsAvailable,
    /// Request body could not be decoded
    InvalidRequestBody(String),
    /// Non-integer limit/offset path segment
    InvalidParameters(String),
    /// Start timestamp after end timestamp
    InvalidTimeRange { start: i64, end: i64 },
    /// Request cancelled by client or server timeout
    RequestCancelled,
    /// Storage or other internal failure
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMetricsAvailable => {
                write!(f, "no metrics available for the specified criteria")
            }
            Self::InvalidRequestBody(_) => {
                write!(f, "invalid request body format or missing fields")
            }
            Self::InvalidParameters(_) => {
                write!(f, "invalid limit or offset parameter; must be integers")
            }
            Self::InvalidTimeRange { .. } => {
                write!(f, "start timestamp cannot be after end timestamp")
            }
            Self::RequestCancelled => {
                write!(f, "request cancelled by client or server timeout")
            }
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoMetricsAvailable => StatusCode::NOT_FOUND,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            Self::InvalidTimeRange { .. } => StatusCode::BAD_REQUEST,
            Self::RequestCancelled => StatusCode::REQUEST_TIMEOUT,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::NoMetricsAvailable => codes::METRICS_NOT_AVAILABLE,
            Self::InvalidRequestBody(_) => codes::INVALID_REQUEST_BODY,
            Self::InvalidParameters(_) => codes::INVALID_PARAMETERS,
            Self::InvalidTimeRange { .. } => codes::INVALID_TIME_RANGE,
            Self::RequestCancelled => codes::REQUEST_CANCELLED,
            Self::InternalError(_) => codes::API_FAILURE,
        }
    }

    /// Severity used when the error is recorded in the event log.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::NoMetricsAvailable | Self::RequestCancelled => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Event log line with the details withheld from the client.
    pub fn log_message(&self) -> String {
        match self {
            Self::NoMetricsAvailable => "Insufficient metrics data".to_string(),
            Self::InvalidRequestBody(detail) => {
                format!("Failed to decode JSON body. Err - {}", detail)
            }
            Self::InvalidParameters(detail) => {
                format!("Failed to parse limit/offset from URL. Err - {}", detail)
            }
            Self::InvalidTimeRange { start, end } => format!(
                "Given startTime is greater than endTime. startTime - {} endTime - {}",
                start, end
            ),
            Self::RequestCancelled => "Request cancelled before the query finished".to_string(),
            Self::InternalError(msg) => format!("Failed to fetch metrics. Err - {}", msg),
        }
    }
}

/// Response envelope shared by success and error responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub error_code: u32,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(value: T) -> Self {
        Self {
            status: true,
            value: Some(value),
            error: None,
            error_code: codes::API_SUCCESS,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CACHE_CONTROL, "no-cache")], Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            status: false,
            value: None,
            error: Some(self.to_string()),
            error_code: self.code(),
        };

        (self.status(), [(header::CACHE_CONTROL, "no-cache")], Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::InvalidTimeRange { start: 10, end: 5 };
        assert_eq!(error.to_string(), "start timestamp cannot be after end timestamp");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NoMetricsAvailable.code(), 101);
        assert_eq!(AppError::InvalidRequestBody("eof".to_string()).code(), 102);
        assert_eq!(AppError::InvalidParameters("x".to_string()).code(), 103);
        assert_eq!(AppError::InvalidTimeRange { start: 2, end: 1 }.code(), 104);
        assert_eq!(AppError::RequestCancelled.code(), 105);
        assert_eq!(AppError::InternalError("db".to_string()).code(), 303001);
    }

    #[test]
    fn test_log_message_keeps_details() {
        let error = AppError::InvalidTimeRange { start: 20, end: 10 };
        assert_eq!(error.log_level(), LogLevel::Error);
        assert!(error.log_message().contains("startTime - 20 endTime - 10"));

        assert_eq!(AppError::NoMetricsAvailable.log_level(), LogLevel::Warn);
        assert!(AppError::InvalidParameters("invalid digit".to_string())
            .log_message()
            .ends_with("invalid digit"));
    }

    #[tokio::test]
    async fn test_error_response() {
        let response = AppError::NoMetricsAvailable.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-cache"
        );
    }

    #[test]
    fn test_success_envelope() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(body["status"], true);
        assert_eq!(body["error_code"], 303000);
        assert!(body.get("error").is_none());
    }
}
