use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use super::models::server::TransportKind;

/// Failure category reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    /// Non-2xx response
    Status(u16),
    /// Body was not valid JSON
    Decode,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Connect => f.write_str("connection failed"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::Decode => f.write_str("invalid response body"),
            Self::Other => f.write_str("request failed"),
        }
    }
}

/// Error returned by an [`McpTransport`](super::ports::McpTransport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Status(code), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, message)
    }
}

/// Errors surfaced by the connection manager.
#[derive(Error, Debug, Clone)]
pub enum McpError {
    #[error("Transport error for server '{server}': {source}")]
    Transport {
        server: String,
        #[source]
        source: TransportError,
    },

    #[error("Server '{0}' is not connected")]
    NotConnected(String),

    #[error("Circuit breaker open for {scope}, retry after {retry_after}")]
    CircuitOpen {
        scope: String,
        retry_after: DateTime<Utc>,
    },

    /// The server answered with `success: false`.
    #[error("{message}")]
    Application { server: String, message: String },

    #[error("Invalid response from server '{server}': {message}")]
    Decode { server: String, message: String },

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Server '{server}' uses unsupported transport: {transport}")]
    UnsupportedTransport {
        server: String,
        transport: TransportKind,
    },
}

impl McpError {
    /// Wrap a transport failure, promoting body decode failures to [`McpError::Decode`].
    pub fn transport(server: impl Into<String>, source: TransportError) -> Self {
        let server = server.into();
        if source.kind == TransportErrorKind::Decode {
            Self::Decode {
                server,
                message: source.message,
            }
        } else {
            Self::Transport { server, source }
        }
    }

    pub fn decode(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Taxonomy label used in user-facing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "TransportError",
            Self::NotConnected(_) => "NotConnectedError",
            Self::CircuitOpen { .. } => "CircuitOpenError",
            Self::Application { .. } => "ApplicationError",
            Self::Decode { .. } => "DecodeError",
            Self::ServerNotFound(_) => "ServerNotFoundError",
            Self::UnsupportedTransport { .. } => "UnsupportedTransportError",
        }
    }

    /// Whether this failure counts against a circuit breaker.
    ///
    /// A server answering `success: false` counts as well, even though it
    /// leaves the connection up.
    pub fn trips_breaker(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Decode { .. } | Self::Application { .. }
        )
    }

}

/// Render an error the way interactive front ends show it.
pub fn format_error_message(err: &McpError, context: &str) -> String {
    format!("Error in {context}: {} - {err}", err.kind())
}
