//! Namespaces: named broadcast scopes with two membership views.
//!
//! `sockets` is the registry of everything that joined and has not left.
//! `connected` is the visible membership that enumeration and broadcast use.
//! A socket may be in `sockets` without being in `connected`; the reverse never holds.

use crate::runtime::socket::{ConnectionId, Socket};

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::RwLock;

/// Called for every socket joining a namespace, with the membership lock held.
pub trait ConnectListener: Send + Sync {
    fn on_connect(&self, namespace: &str, members: &mut Members, socket: &Arc<Socket>);
}

#[derive(Debug, Default)]
pub struct Members {
    sockets: HashMap<ConnectionId, Arc<Socket>>,
    connected: HashMap<ConnectionId, Arc<Socket>>,
}

impl Members {
    fn insert(&mut self, socket: &Arc<Socket>) {
        self.sockets.insert(socket.id(), Arc::clone(socket));
        self.connected.insert(socket.id(), Arc::clone(socket));
    }

    fn remove(&mut self, id: ConnectionId) -> bool {
        self.connected.remove(&id);
        self.sockets.remove(&id).is_some()
    }

    /// Remove `id` from the visible membership. The registry entry stays.
    pub fn hide(&mut self, id: ConnectionId) -> bool {
        self.connected.remove(&id).is_some()
    }

    /// Put a hidden socket back into the visible membership.
    ///
    /// Only succeeds while the registry still knows the socket, so a socket
    /// that left (or disconnected) in the meantime is not resurrected.
    pub fn restore(&mut self, socket: &Arc<Socket>) -> bool {
        if !self.sockets.contains_key(&socket.id()) {
            return false;
        }
        self.connected.insert(socket.id(), Arc::clone(socket));
        true
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.sockets.contains_key(&id)
    }

    pub fn is_visible(&self, id: ConnectionId) -> bool {
        self.connected.contains_key(&id)
    }
}

pub struct Namespace {
    name: String,
    members: RwLock<Members>,
    listeners: RwLock<Vec<Arc<dyn ConnectListener>>>,
}

impl Namespace {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: RwLock::new(Members::default()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn on_connect(&self, listener: Arc<dyn ConnectListener>) {
        self.listeners.write().await.push(listener);
    }

    /// Add a socket and run connect listeners before the membership lock is released.
    pub(crate) async fn add(&self, socket: &Arc<Socket>) {
        let listeners = self.listeners.read().await.clone();
        let mut members = self.members.write().await;
        members.insert(socket);
        for listener in &listeners {
            listener.on_connect(&self.name, &mut members, socket);
        }
    }

    pub(crate) async fn remove(&self, id: ConnectionId) -> bool {
        self.members.write().await.remove(id)
    }

    pub async fn hide(&self, id: ConnectionId) -> bool {
        self.members.write().await.hide(id)
    }

    pub async fn restore(&self, socket: &Arc<Socket>) -> bool {
        self.members.write().await.restore(socket)
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.members.read().await.contains(id)
    }

    pub async fn is_visible(&self, id: ConnectionId) -> bool {
        self.members.read().await.is_visible(id)
    }

    pub async fn connected_ids(&self) -> Vec<ConnectionId> {
        self.members.read().await.connected.keys().copied().collect()
    }

    pub async fn connected_count(&self) -> usize {
        self.members.read().await.connected.len()
    }

    /// Emit to every visible member. Returns how many sockets accepted the frame.
    pub async fn broadcast(&self, event: &str, data: &Value) -> usize {
        self.emit_visible(None, event, data).await
    }

    /// Emit to every visible member except `sender`.
    pub async fn broadcast_from(&self, sender: ConnectionId, event: &str, data: &Value) -> usize {
        self.emit_visible(Some(sender), event, data).await
    }

    async fn emit_visible(&self, except: Option<ConnectionId>, event: &str, data: &Value) -> usize {
        let recipients: Vec<Arc<Socket>> = self
            .members
            .read()
            .await
            .connected
            .values()
            .filter(|socket| Some(socket.id()) != except)
            .cloned()
            .collect();

        let mut delivered = 0;
        for socket in recipients {
            match socket.emit_to(&self.name, event, data) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Broadcast of '{}' on {} skipped a socket: {}", event, self.name, e),
            }
        }
        debug!("Broadcast '{}' on {} to {} socket(s)", event, self.name, delivered);
        delivered
    }
}
