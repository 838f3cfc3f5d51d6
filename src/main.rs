mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Command, Context};
use mediadash::config::Configuration;
use mediadash::error::ApiError;
use tracing::{debug, error, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = Configuration::from_file(&cli.config)?;
    debug!("Configuration loaded from: {}", cli.config);

    let mut ctx = Context::load(config)?;
    let result = commands::run(cli.command, &mut ctx).await;

    if let Some(ApiError::Unauthorized) = result.as_ref().err().and_then(|e| e.downcast_ref::<ApiError>()) {
        warn!("The media server rejected the saved session, run `mediadash login`");
        ctx.forget_token();
    }
    // overlay changes made before a failure are still kept
    if let Err(e) = ctx.save() {
        error!("Failed to save state: {}", e);
    }
    result
}
