//! In-process stand-ins for a transport and an integrator.

use crate::auth::{AUTHENTICATION_EVENT, AuthenticationConfig, Completion, authenticate_socket};
use crate::runtime::{ConnectionId, OUTBOUND_BUFFER, Outbound, ROOT_NAMESPACE, Server, Socket};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;

pub(crate) const TEST_TOKEN: &str = "test-token-12345";
const WAIT: Duration = Duration::from_secs(5);

/// A socket plus the receiving end of its outbound queue, i.e. what a client would see.
pub(crate) struct TestClient {
    pub(crate) socket: Arc<Socket>,
    outbound: mpsc::Receiver<Outbound>,
}

impl TestClient {
    pub(crate) async fn connect(server: &Arc<Server>) -> Self {
        let (tx, outbound) = mpsc::channel(OUTBOUND_BUFFER);
        let socket = server.accept(tx).await;
        Self { socket, outbound }
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.socket.id()
    }

    pub(crate) async fn send(&self, server: &Server, event: &str, data: Value) {
        server
            .dispatch(&self.socket, ROOT_NAMESPACE, event, data)
            .await;
    }

    pub(crate) async fn authenticate(&self, server: &Server, token: &str) {
        self.send(server, AUTHENTICATION_EVENT, json!({ "token": token }))
            .await;
    }

    pub(crate) async fn next(&mut self) -> Outbound {
        tokio::time::timeout(WAIT, self.outbound.recv())
            .await
            .expect("Timed out waiting for outbound frame")
            .expect("Outbound queue closed")
    }

    /// Next frame as `(event, payload)`. Panics on a close.
    pub(crate) async fn next_event(&mut self) -> (String, Value) {
        match self.next().await {
            Outbound::Frame(frame) => {
                let payload = frame.payload().expect("Frame payload should decode");
                (frame.event, payload)
            }
            Outbound::Close => panic!("Expected a frame, got a close"),
        }
    }

    /// Wait for the close request, then tear the socket down the way the transport would.
    pub(crate) async fn expect_close(&mut self, server: &Server) {
        match self.next().await {
            Outbound::Close => {}
            Outbound::Frame(frame) => panic!("Expected a close, got '{}'", frame.event),
        }
        server.remove(&self.socket, "server disconnect").await;
    }

    pub(crate) fn try_next(&mut self) -> Option<Outbound> {
        self.outbound.try_recv().ok()
    }

    pub(crate) async fn disconnect(&self, server: &Server) {
        server.remove(&self.socket, "client disconnect").await;
    }
}

/// Everything the integrator callbacks observed.
pub(crate) struct Recorder {
    pub(crate) attempts: Arc<AtomicUsize>,
    pub(crate) post_authenticated: mpsc::UnboundedReceiver<(ConnectionId, Value)>,
    pub(crate) disconnected: mpsc::UnboundedReceiver<ConnectionId>,
}

impl Recorder {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) async fn next_disconnect(&mut self) -> ConnectionId {
        tokio::time::timeout(WAIT, self.disconnected.recv())
            .await
            .expect("Timed out waiting for disconnect callback")
            .expect("Disconnect channel closed")
    }
}

/// Accepts `{ "token": TEST_TOKEN }`, rejects anything else with "invalid token".
pub(crate) fn token_check(_socket: Arc<Socket>, payload: Value, completion: Completion) {
    match payload.get("token").and_then(Value::as_str) {
        Some(TEST_TOKEN) => completion.accept(),
        _ => completion.reject("invalid token"),
    }
}

/// A server gated by `authenticate`, with every callback recorded.
pub(crate) async fn gated_server<F>(timeout_ms: i64, authenticate: F) -> (Arc<Server>, Recorder)
where
    F: Fn(Arc<Socket>, Value, Completion) + Send + Sync + 'static,
{
    let attempts = Arc::new(AtomicUsize::new(0));
    let (post_tx, post_authenticated) = mpsc::unbounded_channel();
    let (disconnect_tx, disconnected) = mpsc::unbounded_channel();

    let counter = Arc::clone(&attempts);
    let config = AuthenticationConfig::builder()
        .with_on_authenticate(move |socket, payload, completion| {
            counter.fetch_add(1, Ordering::SeqCst);
            authenticate(socket, payload, completion)
        })
        .with_on_post_authenticate(move |socket, payload| {
            let _ = post_tx.send((socket.id(), payload));
        })
        .with_on_disconnect(move |socket| {
            let _ = disconnect_tx.send(socket.id());
        })
        .with_timeout_ms(timeout_ms)
        .build()
        .expect("Config with on_authenticate should build");

    let server = Server::new();
    authenticate_socket(&server, config).await;

    (
        server,
        Recorder {
            attempts,
            post_authenticated,
            disconnected,
        },
    )
}

/// Let spawned gate tasks run until they block.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
