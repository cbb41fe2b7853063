use anyhow::{Context, Result};
use colored::Colorize;
use metrics_service::{
    config,
    event_log::{EventLogger, LogLevel},
};
use std::path::Path;

/// Execute the log command
///
/// Appends one operator message to the event log. A leading level tag
/// (`WARN`, `error`, `2`, ...) sets the severity; untagged text is logged at INFO.
pub async fn execute(config_path: &Path, words: &[String]) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let (level, message) = LogLevel::parse_tagged(&words.join(" "));

    let event_log = EventLogger::new(cfg.event_log);
    event_log.init().context("Failed to initialize event log")?;

    let emitted = event_log.emit(level, message).await;
    let report = event_log.shutdown().await.unwrap_or_default();
    emitted.context("Failed to enqueue message")?;

    if report.failed > 0 || report.close_failed {
        anyhow::bail!(
            "Failed to write to event log {}",
            event_log.config().path.display()
        );
    }

    if report.written == 0 {
        println!(
            "{} {} is below the configured level {}, nothing written",
            "!".yellow(),
            level,
            event_log.config().level
        );
    } else {
        println!(
            "{} {} line appended to {}",
            "✓".green(),
            level,
            event_log.config().path.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, level: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let log_path = dir.join("log").join("events.log");
        let config_path = dir.join("config.toml");
        fs::write(
            &config_path,
            format!(
                "[event_log]\npath = '{}'\nlevel = '{}'\n",
                log_path.display(),
                level
            ),
        )
        .unwrap();
        (config_path, log_path)
    }

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_tagged_and_untagged_messages() {
        let dir = tempfile::tempdir().unwrap();
        let (config_path, log_path) = write_config(dir.path(), "info");

        execute(&config_path, &words("WARN disk almost full")).await.unwrap();
        execute(&config_path, &words("maintenance window starts")).await.unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\tWARN\tdisk almost full"));
        assert!(lines[1].ends_with("\tINFO\tmaintenance window starts"));
    }

    #[tokio::test]
    async fn test_message_below_threshold_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let (config_path, log_path) = write_config(dir.path(), "warn");

        execute(&config_path, &words("debug cache warmed")).await.unwrap();

        assert_eq!(fs::read_to_string(&log_path).unwrap(), "");
    }
}
