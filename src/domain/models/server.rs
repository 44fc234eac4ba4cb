use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport used to reach an MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// REST-style JSON endpoints over HTTP.
    Http,
    /// Child process speaking over stdin/stdout. Not implemented by the manager.
    Stdio,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Stdio => "stdio",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a configured MCP server.
///
/// Loaded once from configuration and never mutated afterwards. The `name`
/// is the routing key for every manager operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerDescriptor {
    /// Unique server name
    pub name: String,

    /// Transport kind
    #[serde(default = "default_transport")]
    pub transport: TransportKind,

    /// Host for HTTP servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port for HTTP servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Launch command for stdio servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Launch arguments for stdio servers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

const fn default_transport() -> TransportKind {
    TransportKind::Http
}

impl ServerDescriptor {
    /// Describe an HTTP server reachable at `host:port`.
    pub fn http(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            transport: TransportKind::Http,
            host: Some(host.into()),
            port: Some(port),
            command: None,
            args: Vec::new(),
        }
    }

    /// Describe a stdio server launched with `command args...`.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportKind::Stdio,
            host: None,
            port: None,
            command: Some(command.into()),
            args,
        }
    }

    /// Base URL for HTTP servers, `None` for other transports or incomplete descriptors.
    pub fn base_url(&self) -> Option<String> {
        match (self.transport, self.host.as_deref(), self.port) {
            (TransportKind::Http, Some(host), Some(port)) => Some(format!("http://{host}:{port}")),
            _ => None,
        }
    }
}
