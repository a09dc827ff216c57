//! Authentication gate for the channel runtime.
//!
//! Sockets are hidden from every namespace's visible membership until an
//! `authentication` event is accepted by the integrator's callback. The
//! callback never sees a socket twice, and a socket that does not
//! authenticate within the timeout is disconnected.

pub mod admission;
pub mod completion;
pub mod config;
mod gate;

pub use admission::AdmissionController;
pub use completion::{AuthError, AuthOutcome, Completion};
pub use config::{AuthenticationConfig, AuthenticationConfigBuilder, timeout_from_millis};

use crate::runtime::Server;

use std::sync::Arc;

/// Inbound: carries the client's credentials.
pub const AUTHENTICATION_EVENT: &str = "authentication";
/// Outbound: the socket was admitted. No payload.
pub const AUTHENTICATED_EVENT: &str = "authenticated";
/// Outbound: the attempt failed. Payload `{ "message": ... }`.
pub const UNAUTHORIZED_EVENT: &str = "unauthorized";

pub const DEFAULT_FAILURE_MESSAGE: &str = "Authentication failure";

/// Put `server` behind an authentication gate.
///
/// Applies to every namespace that exists now or is created later.
pub async fn authenticate_socket(
    server: &Arc<Server>,
    config: AuthenticationConfig,
) -> Arc<AdmissionController> {
    AdmissionController::install(server, config).await
}
