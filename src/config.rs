use crate::event_log::{LogLevel, OverflowPolicy, DEFAULT_QUEUE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for one metrics query
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Seconds to wait for in-flight requests on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

/// Settings for the service's own event log file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventLogConfig {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
    /// Least severe level that is written to the file
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    /// Discard the previous file content on startup instead of appending
    #[serde(default)]
    pub truncate: bool,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            level: default_log_level(),
            truncate: false,
            queue_capacity: default_queue_capacity(),
            overflow: OverflowPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// How far back the generated samples start
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    /// Spacing between generated samples
    #[serde(default = "default_step")]
    pub step_seconds: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window(),
            step_seconds: default_step(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    10
}

fn default_shutdown_timeout() -> u64 {
    25
}

fn default_log_path() -> PathBuf {
    PathBuf::from("log").join("webService.log")
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_database_url() -> String {
    "sqlite:db/metrics.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_window() -> u64 {
    300
}

fn default_step() -> u64 {
    10
}

/// Load configuration from `path` (optional) layered with
/// `METRICS_SERVICE__*` environment variables.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("METRICS_SERVICE").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("Server port must be non-zero");
    }

    if cfg.server.request_timeout_seconds == 0 {
        anyhow::bail!("Server request_timeout_seconds must be at least 1");
    }

    if cfg.event_log.queue_capacity == 0 {
        anyhow::bail!("Event log queue capacity must be at least 1");
    }

    if cfg.event_log.path.as_os_str().is_empty() {
        anyhow::bail!("Event log path cannot be empty");
    }

    if !cfg.database.url.starts_with("sqlite:") {
        anyhow::bail!("Database URL must start with 'sqlite:': {}", cfg.database.url);
    }

    if cfg.database.max_connections == 0 {
        anyhow::bail!("Database max_connections must be at least 1");
    }

    if cfg.ingest.step_seconds == 0 {
        anyhow::bail!("Ingest step_seconds must be at least 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(validate_config(&cfg).is_ok());
        assert_eq!(cfg.event_log.queue_capacity, 1000);
        assert_eq!(cfg.event_log.level, LogLevel::Info);
        assert_eq!(cfg.event_log.overflow, OverflowPolicy::Block);
        assert!(!cfg.event_log.truncate);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut cfg = Config::default();
        cfg.event_log.queue_capacity = 0;

        let result = validate_config(&cfg);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("queue capacity"));
    }

    #[test]
    fn test_validate_rejects_non_sqlite_url() {
        let mut cfg = Config::default();
        cfg.database.url = "postgres://localhost/metrics".to_string();
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[event_log]
path = "/tmp/metrics-service/events.log"
level = "warn"
truncate = true
queue_capacity = 16
overflow = "drop_newest"
"#
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.event_log.level, LogLevel::Warn);
        assert!(cfg.event_log.truncate);
        assert_eq!(cfg.event_log.queue_capacity, 16);
        assert_eq!(cfg.event_log.overflow, OverflowPolicy::DropNewest);
        assert_eq!(cfg.database.url, "sqlite:db/metrics.db");
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.ingest.step_seconds, 10);
    }
}
