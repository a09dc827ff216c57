//! Per-connection authentication state machine.
//!
//! One task per physical connection owns the gate. It waits on three sources
//! at once: the socket's inbound events, the pending completion of an
//! authentication attempt, and the timeout. Because a single task consumes
//! all three, exactly one terminal transition is ever taken.

use crate::auth::completion::{AuthOutcome, Completion};
use crate::auth::config::AuthenticationConfig;
use crate::auth::{
    AUTHENTICATED_EVENT, AUTHENTICATION_EVENT, DEFAULT_FAILURE_MESSAGE, UNAUTHORIZED_EVENT,
};
use crate::runtime::{Server, Socket, SocketEvent};

use std::future::pending;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use serde_json::{Value, json};
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Sleep, sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Rejected,
    TimedOut,
    Disconnected,
}

struct PendingAttempt {
    payload: Value,
    outcome: oneshot::Receiver<AuthOutcome>,
}

type Deadline = Option<Pin<Box<Sleep>>>;

pub(crate) struct ConnectionGate {
    server: Weak<Server>,
    config: Arc<AuthenticationConfig>,
    socket: Arc<Socket>,
    events: mpsc::Receiver<SocketEvent>,
    state: GateState,
}

impl ConnectionGate {
    /// Attach to the socket and spawn the gate task.
    ///
    /// The attachment happens before this returns, and an attached receiver
    /// never skips, so no event published after the socket is accepted can
    /// be missed.
    pub(crate) fn install(
        server: Weak<Server>,
        config: Arc<AuthenticationConfig>,
        socket: Arc<Socket>,
    ) {
        let gate = Self {
            server,
            config,
            events: socket.attach(),
            socket,
            state: GateState::Unauthenticated,
        };
        TokioSpawn(gate.run());
    }

    async fn run(mut self) {
        let mut deadline: Deadline = self.config.timeout().map(|timeout| Box::pin(sleep(timeout)));
        let mut attempt: Option<PendingAttempt> = None;

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(SocketEvent::Message { event, data, .. }) if event == AUTHENTICATION_EVENT => {
                        self.on_authentication(data, &mut attempt);
                    }
                    Some(SocketEvent::Message { .. }) => {}
                    Some(SocketEvent::Disconnect { reason }) => {
                        self.on_disconnect(&reason);
                        return;
                    }
                    None => {
                        self.on_disconnect("event stream closed");
                        return;
                    }
                },
                outcome = wait_for_outcome(&mut attempt) => {
                    let payload = attempt.take().map(|a| a.payload).unwrap_or(Value::Null);
                    match outcome {
                        Ok(outcome) => self.on_completion(payload, outcome, &mut deadline).await,
                        Err(_) => warn!(
                            "Authentication handler for socket {} dropped its completion",
                            self.socket.id()
                        ),
                    }
                },
                _ = wait_for_deadline(&mut deadline) => {
                    deadline = None;
                    self.on_timeout(&mut attempt);
                },
            }
        }
    }

    fn on_authentication(&mut self, payload: Value, attempt: &mut Option<PendingAttempt>) {
        if self.state != GateState::Unauthenticated {
            debug!(
                "Ignoring authentication from socket {} in state {:?}",
                self.socket.id(),
                self.state
            );
            return;
        }

        let (tx, rx) = oneshot::channel();
        self.state = GateState::Authenticating;
        *attempt = Some(PendingAttempt {
            payload: payload.clone(),
            outcome: rx,
        });

        debug!("Socket {} authenticating", self.socket.id());
        self.config.authenticate(
            Arc::clone(&self.socket),
            payload,
            Completion::new(Arc::clone(&self.socket), tx),
        );
    }

    async fn on_completion(&mut self, payload: Value, outcome: AuthOutcome, deadline: &mut Deadline) {
        // The flag decides; an error alongside a set flag is only logged.
        if self.socket.is_authenticated() {
            if let Err(e) = &outcome {
                debug!(
                    "Socket {} is authenticated, ignoring completion error: {}",
                    self.socket.id(),
                    e
                );
            }
            self.admit(payload).await;
            *deadline = None;
            self.state = GateState::Authenticated;
            return;
        }

        let message = match outcome {
            Err(e) => e.message().to_string(),
            Ok(()) => DEFAULT_FAILURE_MESSAGE.to_string(),
        };
        self.reject(&message);
        *deadline = None;
    }

    async fn admit(&mut self, payload: Value) {
        let mut restored = 0;
        if let Some(server) = self.server.upgrade() {
            for namespace in server.namespaces().await {
                if namespace.restore(&self.socket).await {
                    restored += 1;
                }
            }
        }
        info!(
            "Socket {} authenticated, visible in {} namespace(s)",
            self.socket.id(),
            restored
        );

        if let Err(e) = self.socket.emit(AUTHENTICATED_EVENT, &Value::Null) {
            warn!("Failed to notify socket {}: {}", self.socket.id(), e);
        }
        self.config.post_authenticate(Arc::clone(&self.socket), payload);
    }

    fn reject(&mut self, message: &str) {
        warn!("Socket {} rejected: {}", self.socket.id(), message);
        if let Err(e) = self
            .socket
            .emit(UNAUTHORIZED_EVENT, &json!({ "message": message }))
        {
            debug!("Could not send unauthorized to socket {}: {}", self.socket.id(), e);
        }
        self.socket.disconnect();
        self.state = GateState::Rejected;
    }

    fn on_timeout(&mut self, attempt: &mut Option<PendingAttempt>) {
        if self.socket.is_authenticated() {
            debug!("Timeout fired for authenticated socket {}", self.socket.id());
            return;
        }

        warn!(
            "Socket {} did not authenticate in time, disconnecting",
            self.socket.id()
        );
        // A completion arriving after this point finds its receiver gone.
        *attempt = None;
        self.socket.disconnect();
        self.state = GateState::TimedOut;
    }

    fn on_disconnect(&mut self, reason: &str) {
        debug!(
            "Socket {} disconnected ({}) in state {:?}",
            self.socket.id(),
            reason,
            self.state
        );
        self.state = GateState::Disconnected;
        self.config.disconnected(Arc::clone(&self.socket));
    }
}

async fn wait_for_outcome(
    attempt: &mut Option<PendingAttempt>,
) -> Result<AuthOutcome, oneshot::error::RecvError> {
    match attempt {
        Some(attempt) => (&mut attempt.outcome).await,
        None => pending().await,
    }
}

async fn wait_for_deadline(deadline: &mut Deadline) {
    match deadline {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}
