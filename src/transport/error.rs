//! Remote API error types.
//!
//! This module defines error types that distinguish between transient and
//! terminal failures of the remote platform. The distinction drives retry
//! decisions:
//!
//! - **Transient** errors (network, unparsable responses, expired credentials)
//!   are retried with backoff.
//! - **Terminal** errors (permission denied, validation rejection) are
//!   surfaced immediately and never retried.
//!
//! Special case:
//! - A reply rejected with the `TOO_OLD` code means the target is archived.
//!   The reply step treats exactly this code as success; no other code is
//!   generalized that way.

use std::fmt;

use thiserror::Error;

/// Remote error code for replies to archived items.
pub const TOO_OLD: &str = "TOO_OLD";

/// The kind of remote error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection failure, timeout, 5xx or rate limiting.
    Network,

    /// The response could not be parsed into the expected shape.
    Parse,

    /// HTTP 401: the access credential expired or was revoked. Retried after
    /// the session has been refreshed.
    Unauthorized,

    /// HTTP 403: the account may not perform this action.
    Forbidden,

    /// The platform understood the request and refused it (validation error,
    /// archived target, unknown user, ...).
    Rejected,
}

impl TransportErrorKind {
    /// Returns true if this error is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportErrorKind::Network | TransportErrorKind::Parse | TransportErrorKind::Unauthorized
        )
    }
}

/// An error returned by a [`Transport`](super::Transport) call.
#[derive(Debug, Error)]
pub struct TransportError {
    pub kind: TransportErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// The platform's error code (e.g. `TOO_OLD`), if the response carried one.
    pub api_code: Option<String>,

    /// A human-readable description of the error.
    pub message: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status_code, &self.api_code) {
            (Some(code), Some(api)) => {
                write!(f, "remote error (HTTP {}, {}): {}", code, api, self.message)
            }
            (Some(code), None) => write!(f, "remote error (HTTP {}): {}", code, self.message),
            (None, Some(api)) => write!(f, "remote error ({}): {}", api, self.message),
            (None, None) => write!(f, "remote error: {}", self.message),
        }
    }
}

impl TransportError {
    fn with_kind(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        TransportError {
            kind,
            status_code: None,
            api_code: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::with_kind(TransportErrorKind::Network, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::with_kind(TransportErrorKind::Parse, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        TransportError {
            status_code: Some(401),
            ..Self::with_kind(TransportErrorKind::Unauthorized, message)
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        TransportError {
            status_code: Some(403),
            ..Self::with_kind(TransportErrorKind::Forbidden, message)
        }
    }

    /// A refusal carrying the platform's error code.
    pub fn rejected(api_code: impl Into<String>, message: impl Into<String>) -> Self {
        TransportError {
            api_code: Some(api_code.into()),
            ..Self::with_kind(TransportErrorKind::Rejected, message)
        }
    }

    /// Attaches an HTTP status code.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Categorizes a failed HTTP exchange by status code and body text.
    ///
    /// Transport implementations call this so every backend agrees on which
    /// failures are retried.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = match status_code {
            429 => TransportErrorKind::Network,
            403 if is_rate_limit_error(&message) => TransportErrorKind::Network,
            401 => TransportErrorKind::Unauthorized,
            403 => TransportErrorKind::Forbidden,
            code if (500..600).contains(&code) => TransportErrorKind::Network,
            _ => TransportErrorKind::Rejected,
        };
        TransportError {
            kind,
            status_code: Some(status_code),
            api_code: None,
            message,
        }
    }

    /// Categorizes a failure that produced no HTTP status.
    pub fn from_io_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if is_network_error(&message) {
            TransportErrorKind::Network
        } else {
            TransportErrorKind::Parse
        };
        Self::with_kind(kind, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// True for the archived-target rejection on replies.
    pub fn is_too_old(&self) -> bool {
        self.kind == TransportErrorKind::Rejected && self.api_code.as_deref() == Some(TOO_OLD)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == TransportErrorKind::Unauthorized
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind == TransportErrorKind::Forbidden
    }
}

/// A single entry of an error list returned inside an otherwise successful
/// response (e.g. when sending a private message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorEntry {
    pub code: String,
    pub message: String,
}

impl ApiErrorEntry {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiErrorEntry {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("ratelimit")
        || message_lower.contains("too many requests")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}
