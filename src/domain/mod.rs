//! Domain layer for mcp-hub
//!
//! Server descriptors, connection records, capability descriptors and the
//! error taxonomy shared by the services and infrastructure layers.

pub mod error;
pub mod models;
pub mod ports;
pub mod text;

pub use error::{format_error_message, McpError, TransportError, TransportErrorKind};
