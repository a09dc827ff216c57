//! The channel server: namespace and socket registries plus listener hooks.
//!
//! A `Server` is an explicit context object. Nothing here is global, so several
//! servers can live in one process (tests rely on that).

use crate::runtime::namespace::{ConnectListener, Namespace};
use crate::runtime::socket::{ConnectionId, Outbound, Socket, SocketEvent};
use crate::runtime::ROOT_NAMESPACE;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};

/// Called once per physical connection, before it joins any namespace.
pub trait ConnectionListener: Send + Sync {
    fn on_connection(&self, socket: &Arc<Socket>);
}

pub struct Server {
    namespaces: RwLock<HashMap<String, Arc<Namespace>>>,
    sockets: RwLock<HashMap<ConnectionId, Arc<Socket>>>,
    namespace_listeners: RwLock<Vec<Arc<dyn ConnectListener>>>,
    connection_listeners: RwLock<Vec<Arc<dyn ConnectionListener>>>,
}

impl Server {
    /// Create a server holding only the root namespace.
    pub fn new() -> Arc<Self> {
        let mut namespaces = HashMap::new();
        namespaces.insert(
            ROOT_NAMESPACE.to_string(),
            Arc::new(Namespace::new(ROOT_NAMESPACE)),
        );

        Arc::new(Self {
            namespaces: RwLock::new(namespaces),
            sockets: RwLock::new(HashMap::new()),
            namespace_listeners: RwLock::new(Vec::new()),
            connection_listeners: RwLock::new(Vec::new()),
        })
    }

    /// Get a namespace, creating it if needed.
    ///
    /// New namespaces receive every listener registered through
    /// [`Server::on_namespace_connect`] before they become reachable.
    pub async fn of(&self, name: &str) -> Arc<Namespace> {
        if let Some(namespace) = self.namespaces.read().await.get(name) {
            return Arc::clone(namespace);
        }

        // Lock order: namespaces, then namespace_listeners.
        let mut namespaces = self.namespaces.write().await;
        if let Some(namespace) = namespaces.get(name) {
            return Arc::clone(namespace);
        }

        let namespace = Arc::new(Namespace::new(name));
        for listener in self.namespace_listeners.read().await.iter() {
            namespace.on_connect(Arc::clone(listener)).await;
        }
        namespaces.insert(name.to_string(), Arc::clone(&namespace));

        info!("Namespace {} created", name);
        namespace
    }

    pub async fn namespace(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces.read().await.get(name).cloned()
    }

    pub async fn namespaces(&self) -> Vec<Arc<Namespace>> {
        self.namespaces.read().await.values().cloned().collect()
    }

    /// Install a connect listener on every current and future namespace.
    pub async fn on_namespace_connect(&self, listener: Arc<dyn ConnectListener>) {
        let namespaces = self.namespaces.write().await;
        self.namespace_listeners
            .write()
            .await
            .push(Arc::clone(&listener));

        for namespace in namespaces.values() {
            namespace.on_connect(Arc::clone(&listener)).await;
        }
    }

    pub async fn on_connection(&self, listener: Arc<dyn ConnectionListener>) {
        self.connection_listeners.write().await.push(listener);
    }

    /// Register a new physical connection and join it to the root namespace.
    ///
    /// `outbound` is drained by the transport's writer; create it with
    /// [`OUTBOUND_BUFFER`](crate::runtime::OUTBOUND_BUFFER) slots.
    pub async fn accept(&self, outbound: mpsc::Sender<Outbound>) -> Arc<Socket> {
        let socket = Socket::new(outbound);
        self.sockets
            .write()
            .await
            .insert(socket.id(), Arc::clone(&socket));

        let listeners = self.connection_listeners.read().await.clone();
        for listener in &listeners {
            listener.on_connection(&socket);
        }

        self.join(&socket, ROOT_NAMESPACE).await;
        debug!("Socket {} accepted", socket.id());
        socket
    }

    /// Join `socket` to the namespace `name`, creating it on demand.
    ///
    /// Returns `None` if the socket was already removed from the server.
    pub async fn join(&self, socket: &Arc<Socket>, name: &str) -> Option<Arc<Namespace>> {
        if !self.sockets.read().await.contains_key(&socket.id()) {
            warn!("Socket {} tried to join {} after removal", socket.id(), name);
            return None;
        }

        let namespace = self.of(name).await;
        namespace.add(socket).await;
        debug!("Socket {} joined {}", socket.id(), name);
        Some(namespace)
    }

    pub async fn leave(&self, socket: &Arc<Socket>, name: &str) -> bool {
        let Some(namespace) = self.namespace(name).await else {
            return false;
        };
        let left = namespace.remove(socket.id()).await;
        if left {
            debug!("Socket {} left {}", socket.id(), name);
        }
        left
    }

    /// Deliver an inbound event to the socket's subscribers.
    ///
    /// Events for a namespace the socket has not joined are dropped.
    pub async fn dispatch(&self, socket: &Arc<Socket>, namespace: &str, event: &str, data: Value) {
        let joined = match self.namespace(namespace).await {
            Some(ns) => ns.contains(socket.id()).await,
            None => false,
        };
        if !joined {
            warn!(
                "Socket {} sent '{}' on {} without joining it",
                socket.id(),
                event,
                namespace
            );
            return;
        }

        socket
            .publish(SocketEvent::Message {
                namespace: namespace.to_string(),
                event: event.to_string(),
                data,
            })
            .await;
    }

    /// Drop a socket from every namespace and the registry, then publish its
    /// disconnect event. Only the first call for a socket has any effect.
    pub async fn remove(&self, socket: &Arc<Socket>, reason: &str) -> bool {
        if !socket.mark_removed() {
            return false;
        }

        self.sockets.write().await.remove(&socket.id());
        for namespace in self.namespaces().await {
            namespace.remove(socket.id()).await;
        }
        socket.disconnect();

        info!("Socket {} removed: {}", socket.id(), reason);
        socket
            .publish(SocketEvent::Disconnect {
                reason: reason.to_string(),
            })
            .await;
        true
    }

    pub async fn socket(&self, id: ConnectionId) -> Option<Arc<Socket>> {
        self.sockets.read().await.get(&id).cloned()
    }

    pub async fn socket_count(&self) -> usize {
        self.sockets.read().await.len()
    }
}
