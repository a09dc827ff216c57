use common::ErrorLocation;

use gate_core::error::{ConfigError, GateError};

use thiserror::Error;

/// Errors that stop the gate server from starting.
#[derive(Debug, Error)]
pub enum GateServerError {
    /// Error from this binary (directories, environment, startup)
    #[error("Startup Error: {message} {location}")]
    Startup {
        message: String,
        location: ErrorLocation,
    },

    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gate(#[from] GateError),
}

impl GateServerError {
    #[track_caller]
    pub fn startup(message: impl Into<String>) -> Self {
        GateServerError::Startup {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}
