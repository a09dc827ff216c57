use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Ways a shared token can be refused.
#[derive(Debug, ThisError)]
pub enum TokenError {
    #[error("Token Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },

    /// The raw value was empty or only whitespace.
    #[error("Empty Token Error: {source_name} {location}")]
    Empty {
        source_name: String,
        location: ErrorLocation,
    },
}

impl TokenError {
    #[track_caller]
    pub fn empty(source_name: impl Into<String>) -> Self {
        TokenError::Empty {
            source_name: source_name.into(),
            location: ErrorLocation::caller(),
        }
    }
}
