use anyhow::{Context, Result};
use colored::Colorize;
use metrics_service::{
    config,
    event_log::{EventLogger, LogLevel},
    ingest,
    storage::MetricsDb,
};
use std::path::Path;

/// Execute the ingest command
///
/// Generates one sample per step over the configured window ending now.
/// CLI flags override the `[ingest]` section of the configuration.
pub async fn execute(
    config_path: &Path,
    window_seconds: Option<u64>,
    step_seconds: Option<u64>,
) -> Result<()> {
    let mut cfg = config::load_config(config_path)?;
    if let Some(window) = window_seconds {
        cfg.ingest.window_seconds = window;
    }
    if let Some(step) = step_seconds {
        cfg.ingest.step_seconds = step.max(1);
    }

    let event_log = EventLogger::new(cfg.event_log.clone());
    event_log.init().context("Failed to initialize event log")?;

    let db = match MetricsDb::new(&cfg.database.url, cfg.database.max_connections).await {
        Ok(db) => db,
        Err(e) => {
            let _ = event_log
                .emit(LogLevel::Error, format!("Failed to open metrics database: {:#}", e))
                .await;
            event_log.shutdown().await;
            return Err(e);
        }
    };
    let now = chrono::Utc::now().timestamp();
    let summary = ingest::ingest(&db, &cfg.ingest, now).await;
    db.close().await;

    let level = if summary.failed > 0 {
        LogLevel::Warn
    } else {
        LogLevel::Info
    };
    let _ = event_log
        .emit(
            level,
            format!(
                "Ingestion complete: {} stored, {} failed",
                summary.stored, summary.failed
            ),
        )
        .await;
    event_log.shutdown().await;

    println!(
        "{} {} samples stored, {} failed",
        "✓".green(),
        summary.stored,
        summary.failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_database_failure_still_drains_event_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("events.log");

        // A regular file where the database directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            format!(
                "[event_log]\npath = '{}'\n\n[database]\nurl = 'sqlite:{}'\n",
                log_path.display(),
                blocker.join("metrics.db").display()
            ),
        )
        .unwrap();

        assert!(execute(&config_path, Some(60), Some(10)).await.is_err());

        let content = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\tERROR\tFailed to open metrics database"));
    }
}
