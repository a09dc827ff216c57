//! Shared-secret handling with redacted Debug output.

use crate::{ErrorLocation, TokenError};

use std::fmt;

use serde::ser::Error;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// A secret token that never exposes its value in logs or debug output.
#[derive(Clone)]
pub struct RedactedToken {
    inner: String,
}

impl RedactedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    /// Trim `raw` and refuse it if nothing is left.
    ///
    /// `source_name` says where the value came from (an env var, a file) and
    /// ends up in the error; the value itself never does.
    #[track_caller]
    pub fn parse(raw: &str, source_name: &str) -> Result<Self, TokenError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TokenError::empty(source_name));
        }
        Ok(Self::new(trimmed))
    }

    /// The actual secret, for comparison only.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Compare against a presented credential in constant time.
    ///
    /// Only the length may leak; the position of the first differing byte does not.
    pub fn matches(&self, presented: &str) -> bool {
        self.inner.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl fmt::Debug for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedToken([REDACTED])")
    }
}

impl fmt::Display for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED TOKEN]")
    }
}

impl Drop for RedactedToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl serde::Serialize for RedactedToken {
    #[track_caller]
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(TokenError::Serialization {
            message: String::from("RedactedToken cannot be serialized - use expose() explicitly"),
            location: ErrorLocation::caller(),
        }))
    }
}
