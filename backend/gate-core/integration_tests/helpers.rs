//! Test helpers for gate transport integration tests.
//!
//! Every test starts its own server on an ephemeral port, so tests can run in parallel.

use gate_core::config::ServerConfig;
use gate_core::proto::{ClientFrame, ServerFrame};
use gate_core::runtime::ConnectionId;
use gate_core::{
    AuthenticationConfig, GateServerHandle, Server, authenticate_socket, start_gate_server,
};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_AUTH_TOKEN: &str = "test-token-12345";

pub struct TestGate {
    pub server: Arc<Server>,
    pub handle: GateServerHandle,
    pub disconnected: mpsc::UnboundedReceiver<ConnectionId>,
}

impl TestGate {
    pub fn addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }
}

pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        ..ServerConfig::default()
    }
}

/// Start a gated server that accepts `{ "token": TEST_AUTH_TOKEN }`.
pub async fn start_test_gate_server(timeout_ms: i64) -> TestGate {
    let (disconnect_tx, disconnected) = mpsc::unbounded_channel();
    let config = AuthenticationConfig::builder()
        .with_on_authenticate(|_, payload: Value, completion| {
            match payload.get("token").and_then(Value::as_str) {
                Some(TEST_AUTH_TOKEN) => completion.accept(),
                Some(_) => completion.reject("invalid token"),
                None => completion.reject("missing token"),
            }
        })
        .with_on_disconnect(move |socket| {
            let _ = disconnect_tx.send(socket.id());
        })
        .with_timeout_ms(timeout_ms)
        .build()
        .expect("Failed to build auth config");

    let server = Server::new();
    authenticate_socket(&server, config).await;
    let handle = start_gate_server(&test_server_config(), Arc::clone(&server))
        .await
        .expect("Failed to start gate server");

    TestGate {
        server,
        handle,
        disconnected,
    }
}

pub async fn connect_to_server(addr: SocketAddr) -> Ws {
    let url = format!("ws://{addr}");
    let (ws_stream, _) = connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

pub async fn send_frame(ws: &mut Ws, frame: &ClientFrame) {
    ws.send(Message::Binary(frame.encode_to_vec().into()))
        .await
        .expect("Failed to send frame");
}

pub async fn send_event(ws: &mut Ws, namespace: &str, event: &str, data: &Value) {
    let frame = ClientFrame::new_event(namespace, event, data).expect("Failed to encode frame");
    send_frame(ws, &frame).await;
}

/// Next binary frame from the server. Panics on close or timeout.
pub async fn receive_frame(ws: &mut Ws) -> ServerFrame {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Timed out waiting for frame")
        .expect("No message received")
        .expect("Error receiving message");

    match msg {
        Message::Binary(bytes) => ServerFrame::decode(&bytes[..]).expect("Failed to decode frame"),
        other => panic!("Expected binary frame, got {other:?}"),
    }
}

pub async fn authenticate(ws: &mut Ws, token: &str) -> ServerFrame {
    send_event(ws, "/", "authentication", &json!({ "token": token })).await;
    receive_frame(ws).await
}

/// True if the server closes the connection within `wait`.
pub async fn is_connection_closed(ws: &mut Ws, wait: Duration) -> bool {
    match tokio::time::timeout(wait, ws.next()).await {
        Err(_) => false,
        Ok(None) => true,
        Ok(Some(Ok(Message::Close(_)))) => true,
        Ok(Some(Ok(_))) => false,
        Ok(Some(Err(_))) => true,
    }
}

/// True if nothing at all arrives within `wait`.
pub async fn is_silent(ws: &mut Ws, wait: Duration) -> bool {
    tokio::time::timeout(wait, ws.next()).await.is_err()
}
