//! Metric samples and their SQLite store.

pub mod database;

pub use database::MetricsDb;

use serde::{Deserialize, Serialize};

/// One CPU-load / concurrency sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Unix seconds
    pub timestamp: i64,
    pub cpu_load: f64,
    pub concurrency: i64,
}
