//! Port interfaces for the domain layer

pub mod mcp_transport;

pub use mcp_transport::McpTransport;
