//! Binary frame codec for the gate's WebSocket transport.
//!
//! Frames are protobuf messages carried in binary WebSocket messages. The
//! `data` field holds the event payload as JSON bytes; an empty `data` means
//! the event has no payload and decodes to `Value::Null`.

use crate::error::gate::GateError;

use serde_json::Value;

/// What a frame asks the receiver to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum FrameKind {
    /// Join the frame's namespace.
    Connect = 0,
    /// Application or control event within a namespace.
    Event = 1,
    /// Leave the frame's namespace.
    Disconnect = 2,
}

/// Client → Server.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ClientFrame {
    #[prost(enumeration = "FrameKind", tag = "1")]
    pub kind: i32,
    #[prost(string, tag = "2")]
    pub namespace: String,
    #[prost(string, tag = "3")]
    pub event: String,
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
}

/// Server → Client.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ServerFrame {
    #[prost(enumeration = "FrameKind", tag = "1")]
    pub kind: i32,
    #[prost(string, tag = "2")]
    pub namespace: String,
    #[prost(string, tag = "3")]
    pub event: String,
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
}

impl ClientFrame {
    pub fn join(namespace: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Connect as i32,
            namespace: namespace.into(),
            event: String::new(),
            data: Vec::new(),
        }
    }

    pub fn leave(namespace: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Disconnect as i32,
            namespace: namespace.into(),
            event: String::new(),
            data: Vec::new(),
        }
    }

    pub fn new_event(
        namespace: impl Into<String>,
        event: impl Into<String>,
        data: &Value,
    ) -> Result<Self, GateError> {
        Ok(Self {
            kind: FrameKind::Event as i32,
            namespace: namespace.into(),
            event: event.into(),
            data: encode_payload(data)?,
        })
    }

    pub fn payload(&self) -> Result<Value, GateError> {
        decode_payload(&self.data)
    }
}

impl ServerFrame {
    pub fn new_event(
        namespace: impl Into<String>,
        event: impl Into<String>,
        data: &Value,
    ) -> Result<Self, GateError> {
        Ok(Self {
            kind: FrameKind::Event as i32,
            namespace: namespace.into(),
            event: event.into(),
            data: encode_payload(data)?,
        })
    }

    pub fn payload(&self) -> Result<Value, GateError> {
        decode_payload(&self.data)
    }
}

pub(crate) fn encode_payload(data: &Value) -> Result<Vec<u8>, GateError> {
    if data.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::to_vec(data)?)
}

pub(crate) fn decode_payload(data: &[u8]) -> Result<Value, GateError> {
    if data.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(data)?)
}
