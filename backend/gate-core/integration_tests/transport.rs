use crate::helpers::{
    TEST_AUTH_TOKEN, authenticate, connect_to_server, is_connection_closed, is_silent,
    receive_frame, send_event, send_frame, start_test_gate_server,
};

use gate_core::proto::ClientFrame;

use std::time::Duration;

use futures_util::SinkExt;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Public API tests for the gate's WebSocket transport
// These drive a real server over TCP, the way a client would
// ============================================================================

/// **VALUE**: Verifies a client with the right token is admitted over the wire.
///
/// **WHY THIS MATTERS**: This is the happy path every real client takes. If the
/// `authenticated` frame never arrives, no client can use the server.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Inbound frames are not dispatched to the gate
/// - Outbound frames are not written by the writer task
/// - The authenticated socket stays hidden from the root namespace
#[tokio::test]
async fn given_valid_token_when_authenticating_then_receives_authenticated() {
    // GIVEN: A running gate server and a connected client
    let gate = start_test_gate_server(1000).await;
    let mut ws = connect_to_server(gate.addr()).await;

    // WHEN: The client authenticates with the right token
    let response = authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    // THEN: The server confirms, with no payload
    assert_eq!(response.event, "authenticated");
    assert_eq!(response.namespace, "/");
    assert!(response.data.is_empty());

    // THEN: The socket is now visible in the root namespace
    let root = gate.server.namespace("/").await.expect("root namespace");
    assert_eq!(root.connected_count().await, 1);
}

/// **VALUE**: Verifies a rejected client learns why and is then disconnected.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The connection closes before `unauthorized` is flushed
/// - The connection stays open after rejection
#[tokio::test]
async fn given_invalid_token_when_authenticating_then_unauthorized_and_closed() {
    // GIVEN: A connected client
    let gate = start_test_gate_server(1000).await;
    let mut ws = connect_to_server(gate.addr()).await;

    // WHEN: It presents a wrong token
    let response = authenticate(&mut ws, "wrong-token").await;

    // THEN: unauthorized with the handler's message
    assert_eq!(response.event, "unauthorized");
    assert_eq!(
        response.payload().expect("payload"),
        json!({ "message": "invalid token" })
    );

    // THEN: The server closes the connection
    assert!(is_connection_closed(&mut ws, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn given_missing_token_when_authenticating_then_unauthorized_with_reason() {
    let gate = start_test_gate_server(1000).await;
    let mut ws = connect_to_server(gate.addr()).await;

    send_event(&mut ws, "/", "authentication", &json!({})).await;
    let response = receive_frame(&mut ws).await;

    assert_eq!(response.event, "unauthorized");
    assert_eq!(response.payload().expect("payload")["message"], "missing token");
}

/// **VALUE**: Verifies a silent client is dropped after the grace period.
///
/// **WHY THIS MATTERS**: Idle unauthenticated connections are free to open and
/// would otherwise pile up forever.
#[tokio::test]
async fn given_silent_client_when_timeout_elapses_then_connection_closed() {
    // GIVEN: A short grace period
    let mut gate = start_test_gate_server(200).await;
    let mut ws = connect_to_server(gate.addr()).await;

    // WHEN: The client never authenticates
    // THEN: The server closes the connection without sending anything else
    assert!(is_connection_closed(&mut ws, Duration::from_secs(3)).await);

    // THEN: The disconnect callback ran
    let id = tokio::time::timeout(Duration::from_secs(2), gate.disconnected.recv())
        .await
        .expect("disconnect callback should run")
        .expect("channel open");
    assert!(gate.server.socket(id).await.is_none());
}

/// **VALUE**: Verifies broadcast traffic never reaches unauthenticated clients.
///
/// **BUG THIS CATCHES**: Would catch the transport bypassing the visible
/// membership, e.g. by iterating every socket on the server.
#[tokio::test]
async fn given_one_authenticated_client_when_broadcasting_then_only_it_receives() {
    // GIVEN: One admitted and one pending client
    let gate = start_test_gate_server(0).await;
    let mut admitted = connect_to_server(gate.addr()).await;
    let mut pending = connect_to_server(gate.addr()).await;
    let response = authenticate(&mut admitted, TEST_AUTH_TOKEN).await;
    assert_eq!(response.event, "authenticated");

    // WHEN: The root namespace broadcasts
    let root = gate.server.namespace("/").await.expect("root namespace");
    let delivered = root.broadcast("news", &json!({ "headline": "hi" })).await;

    // THEN: Only the admitted client receives it
    assert_eq!(delivered, 1);
    let frame = receive_frame(&mut admitted).await;
    assert_eq!(frame.event, "news");
    assert!(is_silent(&mut pending, Duration::from_millis(200)).await);
}

/// **VALUE**: Namespaces joined before authenticating become visible after it.
#[tokio::test]
async fn given_joined_namespace_when_authenticated_then_visible_there() {
    // GIVEN: A client that joins /chat first
    let gate = start_test_gate_server(1000).await;
    let mut ws = connect_to_server(gate.addr()).await;
    send_frame(&mut ws, &ClientFrame::join("/chat")).await;

    // WHEN: It authenticates
    let response = authenticate(&mut ws, TEST_AUTH_TOKEN).await;
    assert_eq!(response.event, "authenticated");

    // THEN: /chat exists and lists it
    let chat = gate.server.namespace("/chat").await.expect("chat namespace");
    assert_eq!(chat.connected_count().await, 1);
}

#[tokio::test]
async fn given_garbage_bytes_when_sent_then_error_event_and_connection_stays_open() {
    let gate = start_test_gate_server(1000).await;
    let mut ws = connect_to_server(gate.addr()).await;

    ws.send(Message::Binary(vec![0xff, 0xff, 0xff].into()))
        .await
        .expect("send");
    let error = receive_frame(&mut ws).await;

    assert_eq!(error.event, "error");
    let response = authenticate(&mut ws, TEST_AUTH_TOKEN).await;
    assert_eq!(response.event, "authenticated");
}

/// **VALUE**: Verifies the disconnect callback fires once when the client leaves.
#[tokio::test]
async fn given_authenticated_client_when_closing_then_disconnect_callback_once() {
    // GIVEN: An authenticated client
    let mut gate = start_test_gate_server(1000).await;
    let mut ws = connect_to_server(gate.addr()).await;
    let response = authenticate(&mut ws, TEST_AUTH_TOKEN).await;
    assert_eq!(response.event, "authenticated");

    // WHEN: The client closes the connection
    ws.close(None).await.expect("close");

    // THEN: The callback fires exactly once and the server forgets the socket
    let id = tokio::time::timeout(Duration::from_secs(2), gate.disconnected.recv())
        .await
        .expect("disconnect callback should run")
        .expect("channel open");
    assert!(gate.server.socket(id).await.is_none());
    assert!(
        tokio::time::timeout(Duration::from_millis(200), gate.disconnected.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn given_shutdown_when_connecting_then_refused() {
    let gate = start_test_gate_server(1000).await;
    let addr = gate.addr();

    gate.handle.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}")).await;
    assert!(result.is_err());
}
