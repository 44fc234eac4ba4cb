//! Per-server connection record and its state transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::capability::CapabilitySet;
use super::server::{ServerDescriptor, TransportKind};

/// Connection status of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state the manager keeps for one server.
///
/// Records are never removed. Two distinct demotions exist:
/// - [`Connection::disconnect`] drops the base URL and capability cache.
/// - [`Connection::degrade`] only flips the status to `error`.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub server_name: String,
    pub transport: TransportKind,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub status: ConnectionStatus,
    pub error_message: Option<String>,
    /// Last successful health check or call
    pub last_contact: Option<DateTime<Utc>>,
    pub status_changed_at: DateTime<Utc>,
    #[serde(skip)]
    pub base_url: Option<String>,
    #[serde(skip)]
    pub capabilities: Option<Arc<CapabilitySet>>,
}

impl Connection {
    /// Fresh record in `connecting` state for a descriptor.
    pub fn connecting(descriptor: &ServerDescriptor) -> Self {
        Self {
            server_name: descriptor.name.clone(),
            transport: descriptor.transport,
            host: descriptor.host.clone(),
            port: descriptor.port,
            status: ConnectionStatus::Connecting,
            error_message: None,
            last_contact: None,
            status_changed_at: Utc::now(),
            base_url: descriptor.base_url(),
            capabilities: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    fn set_status(&mut self, status: ConnectionStatus, error: Option<String>) {
        self.status = status;
        self.error_message = error;
        self.status_changed_at = Utc::now();
    }

    /// Health check and introspection both succeeded.
    pub fn mark_connected(&mut self) {
        self.set_status(ConnectionStatus::Connected, None);
        self.touch();
    }

    /// Soft demotion: keeps base URL and capabilities.
    pub fn degrade(&mut self, message: impl Into<String>) {
        self.set_status(ConnectionStatus::Error, Some(message.into()));
    }

    /// Explicit teardown: clears base URL and capabilities.
    pub fn disconnect(&mut self) {
        self.set_status(ConnectionStatus::Disconnected, None);
        self.base_url = None;
        self.capabilities = None;
    }

    /// Record a successful contact with the server.
    pub fn touch(&mut self) {
        self.last_contact = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        Connection::connecting(&ServerDescriptor::http("kb", "127.0.0.1", 8002))
    }

    #[test]
    fn test_connecting_record() {
        let conn = connection();
        assert_eq!(conn.status, ConnectionStatus::Connecting);
        assert_eq!(conn.base_url.as_deref(), Some("http://127.0.0.1:8002"));
        assert!(conn.last_contact.is_none());
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_mark_connected_clears_error() {
        let mut conn = connection();
        conn.degrade("boom");
        conn.mark_connected();
        assert!(conn.is_connected());
        assert!(conn.error_message.is_none());
        assert!(conn.last_contact.is_some());
    }

    #[test]
    fn test_degrade_keeps_cache() {
        let mut conn = connection();
        conn.capabilities = Some(Arc::new(CapabilitySet::default()));
        conn.mark_connected();

        conn.degrade("health check failed");

        assert_eq!(conn.status, ConnectionStatus::Error);
        assert_eq!(conn.error_message.as_deref(), Some("health check failed"));
        assert!(conn.base_url.is_some());
        assert!(conn.capabilities.is_some());
    }

    #[test]
    fn test_disconnect_clears_cache() {
        let mut conn = connection();
        conn.capabilities = Some(Arc::new(CapabilitySet::default()));
        conn.mark_connected();

        conn.disconnect();

        assert_eq!(conn.status, ConnectionStatus::Disconnected);
        assert!(conn.base_url.is_none());
        assert!(conn.capabilities.is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert_eq!(ConnectionStatus::Error.as_str(), "error");
    }
}
