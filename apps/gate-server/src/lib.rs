// Library exports for testing
// The binary (main.rs) imports these as well

pub mod authenticator;
pub mod error;
pub mod logger;
pub mod relay;

#[cfg(test)]
mod tests;

use crate::authenticator::SharedTokenAuthenticator;
use crate::error::GateServerError;
use crate::relay::Relay;

use common::RedactedToken;

use gate_core::config::GateConfig;
use gate_core::{GateServerHandle, Server, authenticate_socket, start_gate_server};

use std::path::PathBuf;
use std::sync::Arc;

use log::info;

/// Overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "GATE_CONFIG_DIR";
const APP_DIR_NAME: &str = "socket-gate";

/// `$GATE_CONFIG_DIR`, else `{platform config dir}/socket-gate`.
pub fn config_dir() -> Result<PathBuf, GateServerError> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| GateServerError::startup("No config directory available on this platform"))
}

/// A running gate server.
pub struct RunningGate {
    pub server: Arc<Server>,
    pub handle: GateServerHandle,
}

/// Build the runtime, gate it with the shared token, relay authenticated
/// traffic and start listening.
pub async fn start(config: &GateConfig, token: RedactedToken) -> Result<RunningGate, GateServerError> {
    let server = Server::new();
    for name in &config.server.namespaces {
        server.of(name).await;
    }

    let auth_config = SharedTokenAuthenticator::new(token).into_config(&config.auth)?;
    authenticate_socket(&server, auth_config).await;
    Relay::install(&server).await;

    let handle = start_gate_server(&config.server, Arc::clone(&server)).await?;
    info!(
        "Gate ready on ws://{} ({} namespace(s))",
        handle.local_addr(),
        server.namespaces().await.len()
    );

    Ok(RunningGate { server, handle })
}
