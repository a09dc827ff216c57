//! The single-use handle an authenticate callback resolves.

use crate::runtime::Socket;

use std::sync::Arc;

use log::debug;
use thiserror::Error as ThisError;
use tokio::sync::oneshot;

/// A credential rejection. The message is sent to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct AuthError {
    message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for AuthError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for AuthError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

pub type AuthOutcome = Result<(), AuthError>;

/// Reports the result of one authentication attempt back to its gate.
///
/// Every completing method takes `self`, so an attempt can be completed at
/// most once. Completing after the gate has given up (timeout, disconnect) is
/// ignored. Dropping the handle leaves the attempt pending.
///
/// Whether the attempt succeeded is decided by the socket's authenticated
/// flag, not by the outcome: call [`Socket::set_authenticated`] before
/// [`Completion::resolve`], or use [`Completion::accept`].
#[derive(Debug)]
pub struct Completion {
    socket: Arc<Socket>,
    tx: oneshot::Sender<AuthOutcome>,
}

impl Completion {
    pub(crate) fn new(socket: Arc<Socket>, tx: oneshot::Sender<AuthOutcome>) -> Self {
        Self { socket, tx }
    }

    pub fn socket(&self) -> &Arc<Socket> {
        &self.socket
    }

    pub fn complete(self, outcome: AuthOutcome) {
        if self.tx.send(outcome).is_err() {
            debug!(
                "Completion for socket {} arrived after its gate finished",
                self.socket.id()
            );
        }
    }

    /// Complete without an error.
    pub fn resolve(self) {
        self.complete(Ok(()))
    }

    pub fn reject(self, error: impl Into<AuthError>) {
        self.complete(Err(error.into()))
    }

    /// Mark the socket authenticated and resolve.
    pub fn accept(self) {
        self.socket.set_authenticated();
        self.resolve()
    }
}
