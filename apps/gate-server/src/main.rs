use gate_server::authenticator::resolve_token;
use gate_server::error::GateServerError;
use gate_server::logger::{initialize as LoggerInitialize, level_from_env};
use gate_server::{config_dir, start};

use gate_core::config::GateConfig;

use std::fs::create_dir_all;

use log::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{e}");
        eprintln!("gate-server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), GateServerError> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let config_dir = config_dir()?;
    let log_dir = config_dir.join("logs");
    create_dir_all(&log_dir).map_err(|e| {
        GateServerError::startup(format!(
            "Failed to create log directory {}: {e}",
            log_dir.display()
        ))
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir, level_from_env()?)?;

    info!("Socket gate starting");
    info!("Config directory: {}", config_dir.display());

    let config = GateConfig::load(&config_dir)?;
    let token = resolve_token(&config.auth.token_env);
    let running = start(&config, token).await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| GateServerError::startup(format!("Failed to listen for Ctrl-C: {e}")))?;

    info!("Shutting down ({} socket(s) connected)", running.server.socket_count().await);
    running.handle.shutdown();
    Ok(())
}
