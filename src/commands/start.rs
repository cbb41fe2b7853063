use anyhow::Result;
use colored::Colorize;
use metrics_service::{config, server};
use std::path::Path;
use tracing::info;

/// Execute the start command
///
/// Loads configuration and runs the server until a shutdown signal arrives.
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting metrics service...".green());

    let cfg = config::load_config(config_path)?;
    info!(
        log = %cfg.event_log.path.display(),
        database = %cfg.database.url,
        "Starting metrics service"
    );

    server::start_server(cfg).await?;

    Ok(())
}
