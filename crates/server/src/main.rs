mod bootstrap;

use anyhow::Result;
use huddle_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use huddle_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "huddle-server started"
    );

    tokio::select! {
        result = app.gateway_runner.start() => result?,
        _ = wait_for_shutdown() => {}
    }

    app.expiry_sweeper.abort();
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "huddle-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    // A failed signal registration would otherwise busy-stop the select.
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
