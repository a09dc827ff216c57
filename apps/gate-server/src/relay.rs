//! Relays events from authenticated sockets to their namespace peers.

use gate_core::auth::AUTHENTICATION_EVENT;
use gate_core::runtime::{ConnectionListener, SocketEvent};
use gate_core::{Server, Socket};

use std::sync::{Arc, Weak};

use log::{debug, warn};
use tokio::spawn as TokioSpawn;
use tokio::sync::broadcast::error::RecvError;

pub struct Relay {
    server: Weak<Server>,
}

impl Relay {
    pub async fn install(server: &Arc<Server>) -> Arc<Self> {
        let relay = Arc::new(Self {
            server: Arc::downgrade(server),
        });
        server
            .on_connection(Arc::clone(&relay) as Arc<dyn ConnectionListener>)
            .await;
        relay
    }
}

impl ConnectionListener for Relay {
    fn on_connection(&self, socket: &Arc<Socket>) {
        let mut events = socket.subscribe();
        let server = Weak::clone(&self.server);
        let socket = Arc::clone(socket);

        TokioSpawn(async move {
            loop {
                match events.recv().await {
                    Ok(SocketEvent::Message {
                        namespace,
                        event,
                        data,
                    }) => {
                        if event == AUTHENTICATION_EVENT {
                            continue;
                        }
                        if !socket.is_authenticated() {
                            debug!("Dropping '{}' from unauthenticated socket {}", event, socket.id());
                            continue;
                        }
                        let Some(server) = server.upgrade() else {
                            break;
                        };
                        if let Some(target) = server.namespace(&namespace).await {
                            target.broadcast_from(socket.id(), &event, &data).await;
                        }
                    }
                    Ok(SocketEvent::Disconnect { .. }) | Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Relay for socket {} skipped {} event(s)", socket.id(), skipped);
                    }
                }
            }
        });
    }
}
