use crate::authenticator::SharedTokenAuthenticator;
use crate::relay::Relay;

use common::RedactedToken;

use gate_core::auth::AUTHENTICATION_EVENT;
use gate_core::config::AuthConfig;
use gate_core::runtime::{OUTBOUND_BUFFER, Outbound, ROOT_NAMESPACE};
use gate_core::{Server, Socket, authenticate_socket};

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;

pub(crate) const TEST_TOKEN: &str = "s3cret-token";

pub(crate) async fn gated_server(with_relay: bool) -> Arc<Server> {
    let server = Server::new();
    let config = SharedTokenAuthenticator::new(RedactedToken::new(TEST_TOKEN))
        .into_config(&AuthConfig::default())
        .expect("config should build");
    authenticate_socket(&server, config).await;
    if with_relay {
        Relay::install(&server).await;
    }
    server
}

pub(crate) struct Peer {
    pub(crate) socket: Arc<Socket>,
    outbound: mpsc::Receiver<Outbound>,
}

impl Peer {
    pub(crate) async fn connect(server: &Arc<Server>) -> Self {
        let (tx, outbound) = mpsc::channel(OUTBOUND_BUFFER);
        let socket = server.accept(tx).await;
        Self { socket, outbound }
    }

    pub(crate) async fn send(&self, server: &Server, event: &str, data: Value) {
        server
            .dispatch(&self.socket, ROOT_NAMESPACE, event, data)
            .await;
    }

    pub(crate) async fn authenticate(&mut self, server: &Server, payload: Value) -> (String, Value) {
        self.send(server, AUTHENTICATION_EVENT, payload).await;
        self.next_event().await
    }

    pub(crate) async fn login(&mut self, server: &Server) {
        let (event, _) = self.authenticate(server, json!({ "token": TEST_TOKEN })).await;
        assert_eq!(event, "authenticated");
    }

    pub(crate) async fn next_event(&mut self) -> (String, Value) {
        let outbound = tokio::time::timeout(Duration::from_secs(5), self.outbound.recv())
            .await
            .expect("Timed out waiting for frame")
            .expect("Outbound queue closed");
        match outbound {
            Outbound::Frame(frame) => {
                let payload = frame.payload().expect("payload should decode");
                (frame.event, payload)
            }
            Outbound::Close => panic!("Expected a frame, got a close"),
        }
    }

    pub(crate) async fn is_quiet(&mut self) -> bool {
        tokio::time::timeout(Duration::from_millis(100), self.outbound.recv())
            .await
            .is_err()
    }
}
