//! Shared-token credential check used by the demo server.

use common::RedactedToken;

use gate_core::config::AuthConfig;
use gate_core::error::ConfigError;
use gate_core::{AuthenticationConfig, Completion, Socket};

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use uuid::Uuid;

/// Payload field carrying the presented token.
pub const TOKEN_FIELD: &str = "token";
pub const INVALID_TOKEN_MESSAGE: &str = "invalid token";
pub const MISSING_TOKEN_MESSAGE: &str = "missing token";

/// Accepts `{ "token": <secret> }` when the secret matches the configured one.
#[derive(Debug)]
pub struct SharedTokenAuthenticator {
    token: RedactedToken,
}

impl SharedTokenAuthenticator {
    pub fn new(token: RedactedToken) -> Self {
        Self { token }
    }

    pub fn authenticate(&self, socket: &Socket, payload: &Value, completion: Completion) {
        match payload.get(TOKEN_FIELD).and_then(Value::as_str) {
            Some(presented) if self.token.matches(presented) => {
                debug!("Socket {} presented a valid token", socket.id());
                completion.accept();
            }
            Some(_) => {
                warn!("Socket {} presented an invalid token", socket.id());
                completion.reject(INVALID_TOKEN_MESSAGE);
            }
            None => {
                warn!("Socket {} sent authentication without a token", socket.id());
                completion.reject(MISSING_TOKEN_MESSAGE);
            }
        }
    }

    /// Wire this authenticator into a gate configuration.
    pub fn into_config(self, auth: &AuthConfig) -> Result<AuthenticationConfig, ConfigError> {
        let authenticator = Arc::new(self);
        AuthenticationConfig::builder()
            .with_on_authenticate(move |socket, payload, completion| {
                authenticator.authenticate(&socket, &payload, completion)
            })
            .with_on_post_authenticate(|socket, _| {
                info!("Socket {} admitted", socket.id());
            })
            .with_on_disconnect(|socket| {
                info!(
                    "Socket {} gone (authenticated: {})",
                    socket.id(),
                    socket.is_authenticated()
                );
            })
            .with_timeout_ms(auth.timeout_ms)
            .build()
    }
}

/// Read the shared token from `env_var`, or generate one.
///
/// A generated token is logged once so a local client can be pointed at it.
pub fn resolve_token(env_var: &str) -> RedactedToken {
    let configured = std::env::var(env_var)
        .ok()
        .map(|raw| RedactedToken::parse(&raw, env_var));

    match configured {
        Some(Ok(token)) => {
            info!("Using shared token from ${}", env_var);
            token
        }
        Some(Err(e)) => {
            warn!("Ignoring shared token: {}", e);
            generate_token(env_var)
        }
        None => generate_token(env_var),
    }
}

fn generate_token(env_var: &str) -> RedactedToken {
    let token = Uuid::new_v4().to_string();
    info!("${} not usable, generated shared token: {}", env_var, token);
    RedactedToken::new(token)
}
