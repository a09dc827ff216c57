pub mod auth;
pub mod config;
pub mod error;
pub mod proto;
pub mod runtime;
pub mod transport;

#[cfg(test)]
mod tests;

pub use auth::{AuthError, AuthenticationConfig, Completion, authenticate_socket};
pub use runtime::{Namespace, Server, Socket};
pub use transport::{GateServerHandle, start_gate_server};
