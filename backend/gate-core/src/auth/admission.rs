//! Hides unauthenticated sockets from namespace membership and installs one
//! gate per physical connection.

use crate::auth::config::AuthenticationConfig;
use crate::auth::gate::ConnectionGate;
use crate::runtime::{ConnectListener, ConnectionListener, Members, Server, Socket};

use std::sync::{Arc, Weak};

use log::{debug, info};

pub struct AdmissionController {
    server: Weak<Server>,
    config: Arc<AuthenticationConfig>,
}

impl AdmissionController {
    pub(crate) async fn install(server: &Arc<Server>, config: AuthenticationConfig) -> Arc<Self> {
        let controller = Arc::new(Self {
            server: Arc::downgrade(server),
            config: Arc::new(config),
        });

        server.on_namespace_connect(Arc::clone(&controller) as Arc<dyn ConnectListener>).await;
        server.on_connection(Arc::clone(&controller) as Arc<dyn ConnectionListener>).await;

        info!(
            "Authentication gate installed (timeout: {})",
            match controller.config.timeout() {
                Some(timeout) => format!("{}ms", timeout.as_millis()),
                None => String::from("disabled"),
            }
        );
        controller
    }
}

impl ConnectListener for AdmissionController {
    fn on_connect(&self, namespace: &str, members: &mut Members, socket: &Arc<Socket>) {
        if socket.is_authenticated() {
            return;
        }
        if members.hide(socket.id()) {
            debug!("Socket {} hidden from {} until authenticated", socket.id(), namespace);
        }
    }
}

impl ConnectionListener for AdmissionController {
    fn on_connection(&self, socket: &Arc<Socket>) {
        ConnectionGate::install(
            Weak::clone(&self.server),
            Arc::clone(&self.config),
            Arc::clone(socket),
        );
    }
}
