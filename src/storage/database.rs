//! SQLite database layer for metric samples
//!
//! - Connection pooling with WAL mode for concurrent reads during ingestion
//! - Embedded migrations
//! - Time-ranged, paginated reads

use super::Metric;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

/// Metric store handle
pub struct MetricsDb {
    pool: SqlitePool,
}

impl MetricsDb {
    /// Open (or create) the database and run migrations
    ///
    /// # Example
    ///
    /// ```ignore
    /// let db = MetricsDb::new("sqlite:./db/metrics.db", 5).await?;
    /// ```
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .pragma("synchronous", "NORMAL");

        let in_memory = database_url.contains(":memory:");
        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        // Every in-memory connection is a separate database
        let max_connections = if in_memory {
            1
        } else {
            max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to metrics database {}", database_url))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run metrics database migrations")?;

        tracing::info!("Metrics database initialized");
        Ok(Self { pool })
    }

    pub async fn store_metric(&self, metric: &Metric) -> Result<()> {
        sqlx::query("INSERT INTO metrics (timestamp, cpu_load, concurrency) VALUES (?, ?, ?)")
            .bind(metric.timestamp)
            .bind(metric.cpu_load)
            .bind(metric.concurrency)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert metric at {}", metric.timestamp))?;

        crate::metrics::record_sample_stored();
        Ok(())
    }

    /// Samples with `start <= timestamp <= end`, oldest first.
    ///
    /// `limit <= 0` returns every match; a negative `offset` is treated as 0.
    pub async fn get_metrics(
        &self,
        start: i64,
        end: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Metric>> {
        let limit = if limit <= 0 { -1 } else { limit };
        let offset = offset.max(0);

        let rows = sqlx::query(
            "SELECT timestamp, cpu_load, concurrency
             FROM metrics
             WHERE timestamp >= ? AND timestamp <= ?
             ORDER BY timestamp ASC
             LIMIT ? OFFSET ?",
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query metrics")?;

        let mut metrics = Vec::with_capacity(rows.len());
        for row in rows {
            match scan_metric(&row) {
                Ok(metric) => metrics.push(metric),
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable metrics row"),
            }
        }

        Ok(metrics)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn scan_metric(row: &sqlx::sqlite::SqliteRow) -> std::result::Result<Metric, sqlx::Error> {
    Ok(Metric {
        timestamp: row.try_get("timestamp")?,
        cpu_load: row.try_get("cpu_load")?,
        concurrency: row.try_get("concurrency")?,
    })
}
