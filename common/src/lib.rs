//! Shared building blocks for the socket gate workspace.
//!
//! - [`ErrorLocation`]: file/line/column captured via `#[track_caller]`,
//!   embedded in every error variant across the workspace.
//! - [`RedactedToken`]: a shared secret that never shows up in logs.

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::token_error::TokenError;
pub use redacted_token::RedactedToken;
