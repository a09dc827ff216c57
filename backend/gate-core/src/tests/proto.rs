use crate::error::GateError;
use crate::proto::{ClientFrame, FrameKind, ServerFrame};

use prost::Message;
use serde_json::{Value, json};

#[test]
fn given_event_frame_when_decoded_then_fields_and_payload_survive() {
    let frame = ClientFrame::new_event("/chat", "authentication", &json!({ "token": "abc" }))
        .expect("encode");

    let decoded = ClientFrame::decode(frame.encode_to_vec().as_slice()).expect("decode");

    assert_eq!(FrameKind::try_from(decoded.kind).ok(), Some(FrameKind::Event));
    assert_eq!(decoded.namespace, "/chat");
    assert_eq!(decoded.event, "authentication");
    assert_eq!(decoded.payload().expect("payload"), json!({ "token": "abc" }));
}

/// **VALUE**: `authenticated` carries no payload on the wire.
///
/// **WHY THIS MATTERS**: Clients distinguish "no payload" from `null` JSON.
#[test]
fn given_null_payload_when_encoded_then_data_is_empty() {
    let frame = ServerFrame::new_event("/", "authenticated", &Value::Null).expect("encode");

    assert!(frame.data.is_empty());
    assert_eq!(frame.payload().expect("payload"), Value::Null);
}

#[test]
fn given_join_and_leave_when_built_then_kinds_match() {
    assert_eq!(ClientFrame::join("/lobby").kind, FrameKind::Connect as i32);
    assert_eq!(ClientFrame::leave("/lobby").kind, FrameKind::Disconnect as i32);
}

#[test]
fn given_garbage_payload_when_decoding_then_payload_error() {
    let frame = ClientFrame {
        kind: FrameKind::Event as i32,
        namespace: String::from("/"),
        event: String::from("authentication"),
        data: b"{not json".to_vec(),
    };

    assert!(matches!(frame.payload(), Err(GateError::Payload { .. })));
}

#[test]
fn given_truncated_bytes_when_decoding_then_decode_error() {
    let bytes = ServerFrame::new_event("/", "news", &json!("x"))
        .expect("encode")
        .encode_to_vec();

    let result = ServerFrame::decode(&bytes[..bytes.len() - 1]).map_err(GateError::from);

    assert!(matches!(result, Err(GateError::ProtobufDecode { .. })));
}
