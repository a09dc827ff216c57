//! Minimal realtime channel runtime: a server, its namespaces and sockets.

pub mod namespace;
pub mod server;
pub mod socket;

pub use namespace::{ConnectListener, Members, Namespace};
pub use server::{ConnectionListener, Server};
pub use socket::{ConnectionId, OUTBOUND_BUFFER, Outbound, Socket, SocketEvent};

pub const ROOT_NAMESPACE: &str = "/";

/// Sent to a client whose frame could not be decoded.
pub const ERROR_EVENT: &str = "error";
