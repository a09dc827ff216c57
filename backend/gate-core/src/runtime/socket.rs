//! A single physical connection.

use crate::error::gate::GateError;
use crate::proto::ServerFrame;
use crate::runtime::ROOT_NAMESPACE;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

/// Frames queued for the writer before the socket counts as a slow consumer.
pub const OUTBOUND_BUFFER: usize = 100;

/// Inbound events buffered per broadcast subscriber before it starts lagging.
const EVENT_BUFFER: usize = 64;

/// Inbound events buffered for an attached listener before publishing waits.
const LISTENER_BUFFER: usize = 100;

/// Opaque, stable identifier of a socket for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Work for the transport's write half.
#[derive(Debug)]
pub enum Outbound {
    Frame(ServerFrame),
    /// Close the connection once every frame queued before it has been written.
    Close,
}

/// Inbound events published to a socket's subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Message {
        namespace: String,
        event: String,
        data: Value,
    },
    /// Published exactly once, after the socket left every namespace.
    Disconnect { reason: String },
}

pub struct Socket {
    id: ConnectionId,
    authenticated: AtomicBool,
    removed: AtomicBool,
    backlogged: AtomicBool,
    outbound: mpsc::Sender<Outbound>,
    closing: watch::Sender<bool>,
    events: broadcast::Sender<SocketEvent>,
    listeners: Mutex<Vec<mpsc::Sender<SocketEvent>>>,
}

impl Socket {
    pub(crate) fn new(outbound: mpsc::Sender<Outbound>) -> Arc<Self> {
        let (closing, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Arc::new(Self {
            id: ConnectionId::new(),
            authenticated: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            backlogged: AtomicBool::new(false),
            outbound,
            closing,
            events,
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Mark the socket as authenticated.
    ///
    /// The flag only ever moves from `false` to `true`. Returns `true` if this
    /// call performed the transition.
    pub fn set_authenticated(&self) -> bool {
        !self.authenticated.swap(true, Ordering::SeqCst)
    }

    /// Emit an event on the root namespace.
    pub fn emit(&self, event: &str, data: &Value) -> Result<(), GateError> {
        self.emit_to(ROOT_NAMESPACE, event, data)
    }

    /// Emit an event scoped to `namespace`.
    pub fn emit_to(&self, namespace: &str, event: &str, data: &Value) -> Result<(), GateError> {
        if self.is_closing() {
            return Err(GateError::closed(format!(
                "socket {} is closing, dropped '{event}'",
                self.id
            )));
        }

        let frame = ServerFrame::new_event(namespace, event, data)?;
        match self.outbound.try_send(Outbound::Frame(frame)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Socket {} has {} frames queued, disconnecting slow consumer",
                    self.id, OUTBOUND_BUFFER
                );
                self.disconnect();
                Err(GateError::closed(format!(
                    "socket {} outbound queue full, dropped '{event}'",
                    self.id
                )))
            }
            Err(TrySendError::Closed(_)) => Err(GateError::closed(format!(
                "socket {} has no writer",
                self.id
            ))),
        }
    }

    /// Ask the transport to close this socket.
    ///
    /// Idempotent. Frames emitted before this call are still delivered,
    /// unless the queue is full: then the socket is backlogged and the
    /// transport drops the pending frames.
    /// Returns `true` for the call that initiated the close.
    pub fn disconnect(&self) -> bool {
        if self.closing.send_replace(true) {
            return false;
        }
        debug!("Socket {} closing", self.id);
        if self.outbound.try_send(Outbound::Close).is_err() {
            self.backlogged.store(true, Ordering::SeqCst);
        }
        true
    }

    pub fn is_closing(&self) -> bool {
        *self.closing.borrow()
    }

    /// `true` once a close request could not be queued behind pending frames.
    pub fn is_backlogged(&self) -> bool {
        self.backlogged.load(Ordering::SeqCst)
    }

    /// Resolves once [`Socket::disconnect`] has been called.
    pub async fn closed(&self) {
        let mut rx = self.closing.subscribe();
        let _ = rx.wait_for(|closing| *closing).await;
    }

    /// Subscribe to inbound events. Only events published after this call are seen.
    ///
    /// A subscriber that falls more than a buffer behind skips events.
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.events.subscribe()
    }

    /// Receive every inbound event published after this call, in order.
    ///
    /// Nothing is skipped: publishing waits while the receiver is full.
    /// Dropping the receiver detaches it.
    pub fn attach(&self) -> mpsc::Receiver<SocketEvent> {
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER);
        self.lock_listeners().push(tx);
        rx
    }

    pub(crate) async fn publish(&self, event: SocketEvent) {
        let listeners = self.lock_listeners().clone();
        let mut detached = false;
        for listener in &listeners {
            if listener.send(event.clone()).await.is_err() {
                detached = true;
            }
        }
        if detached {
            self.lock_listeners().retain(|listener| !listener.is_closed());
        }

        // No subscribers is fine: nobody cares about this socket's events.
        let _ = self.events.send(event);
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<mpsc::Sender<SocketEvent>>> {
        // The list stays consistent even if a holder panicked.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `true` the first time it is called.
    pub(crate) fn mark_removed(&self) -> bool {
        !self.removed.swap(true, Ordering::SeqCst)
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.id)
            .field("authenticated", &self.is_authenticated())
            .field("closing", &self.is_closing())
            .field("backlogged", &self.is_backlogged())
            .finish()
    }
}
