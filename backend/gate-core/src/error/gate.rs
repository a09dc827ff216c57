use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Debug, ThisError)]
pub enum GateError {
    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protobuf Decode Error: {message} {location}")]
    ProtobufDecode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Payload Error: {message} {location}")]
    Payload {
        message: String,
        location: ErrorLocation,
    },

    #[error("Socket Closed: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },
}

impl GateError {
    #[track_caller]
    pub fn closed(message: impl Into<String>) -> Self {
        GateError::Closed {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn read(message: impl Into<String>) -> Self {
        GateError::Read {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<IoError> for GateError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        GateError::Io {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<prost::DecodeError> for GateError {
    #[track_caller]
    fn from(error: prost::DecodeError) -> Self {
        GateError::ProtobufDecode {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<serde_json::Error> for GateError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        GateError::Payload {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<WsError> for GateError {
    #[track_caller]
    fn from(error: WsError) -> Self {
        GateError::Send {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
