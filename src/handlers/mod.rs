pub mod metrics_api;
pub mod metrics_handler;
