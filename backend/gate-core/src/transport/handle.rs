//! Handle to a running gate server.

use std::net::SocketAddr;

use log::debug;
use tokio::sync::oneshot;

/// Returned by [`start_gate_server`](crate::transport::start_gate_server).
///
/// The accept loop runs until [`GateServerHandle::shutdown`] is called or the
/// handle is dropped. Connections already accepted are not interrupted.
#[derive(Debug)]
pub struct GateServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl GateServerHandle {
    pub(crate) fn new(local_addr: SocketAddr, shutdown_tx: oneshot::Sender<()>) -> Self {
        Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// The bound address, useful when the configured port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take()
            && tx.send(()).is_err()
        {
            debug!("Gate server on {} already stopped", self.local_addr);
        }
    }
}
