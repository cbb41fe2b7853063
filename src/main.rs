use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use metrics_service::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    init_tracing();

    match args.get_command() {
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Ingest {
            window_seconds,
            step_seconds,
        } => {
            commands::ingest::execute(&args.config, window_seconds, step_seconds).await?;
        }
        cli::Commands::Log { message } => {
            commands::log::execute(&args.config, &message).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("Metrics Service v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
