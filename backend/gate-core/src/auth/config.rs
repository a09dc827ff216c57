use crate::auth::completion::Completion;
use crate::config::DEFAULT_TIMEOUT_MS;
use crate::error::config::ConfigError;
use crate::runtime::Socket;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

pub type AuthenticateFn = dyn Fn(Arc<Socket>, Value, Completion) + Send + Sync;
pub type PostAuthenticateFn = dyn Fn(Arc<Socket>, Value) + Send + Sync;
pub type DisconnectFn = dyn Fn(Arc<Socket>) + Send + Sync;

/// Callbacks and timeout shared by every gate of one server. Immutable once built.
#[derive(Clone)]
pub struct AuthenticationConfig {
    on_authenticate: Arc<AuthenticateFn>,
    on_post_authenticate: Option<Arc<PostAuthenticateFn>>,
    on_disconnect: Option<Arc<DisconnectFn>>,
    timeout: Option<Duration>,
}

impl AuthenticationConfig {
    pub fn builder() -> AuthenticationConfigBuilder {
        AuthenticationConfigBuilder::default()
    }

    /// `None` means unauthenticated sockets are never timed out.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn authenticate(&self, socket: Arc<Socket>, payload: Value, completion: Completion) {
        (self.on_authenticate)(socket, payload, completion)
    }

    pub(crate) fn post_authenticate(&self, socket: Arc<Socket>, payload: Value) {
        if let Some(callback) = &self.on_post_authenticate {
            callback(socket, payload)
        }
    }

    pub(crate) fn disconnected(&self, socket: Arc<Socket>) {
        if let Some(callback) = &self.on_disconnect {
            callback(socket)
        }
    }
}

impl fmt::Debug for AuthenticationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationConfig")
            .field("on_post_authenticate", &self.on_post_authenticate.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Converts a millisecond setting into a timeout. Zero or negative disables it.
pub fn timeout_from_millis(timeout_ms: i64) -> Option<Duration> {
    u64::try_from(timeout_ms)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

#[derive(Default)]
pub struct AuthenticationConfigBuilder {
    on_authenticate: Option<Arc<AuthenticateFn>>,
    on_post_authenticate: Option<Arc<PostAuthenticateFn>>,
    on_disconnect: Option<Arc<DisconnectFn>>,
    timeout_ms: Option<i64>,
}

impl AuthenticationConfigBuilder {
    pub fn with_on_authenticate<F>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<Socket>, Value, Completion) + Send + Sync + 'static,
    {
        self.on_authenticate = Some(Arc::new(callback));
        self
    }

    pub fn with_on_post_authenticate<F>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<Socket>, Value) + Send + Sync + 'static,
    {
        self.on_post_authenticate = Some(Arc::new(callback));
        self
    }

    pub fn with_on_disconnect<F>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<Socket>) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(callback));
        self
    }

    /// Defaults to 1000 ms when never called.
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    #[track_caller]
    pub fn build(self) -> Result<AuthenticationConfig, ConfigError> {
        let on_authenticate = self
            .on_authenticate
            .ok_or_else(|| ConfigError::validation("on_authenticate is required"))?;

        Ok(AuthenticationConfig {
            on_authenticate,
            on_post_authenticate: self.on_post_authenticate,
            on_disconnect: self.on_disconnect,
            timeout: timeout_from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        })
    }
}
