//! mcp-hub - resilient client for multiple MCP servers
//!
//! Connects to a configured set of MCP servers over HTTP, caches what each
//! one advertises (tools, resources, prompts) and routes calls to them.
//! Every remote operation goes through a circuit breaker, and capability
//! introspection is retried with exponential backoff.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, the error taxonomy and the transport port
//! - **Service Layer** (`services`): retry policy and circuit breakers
//! - **Infrastructure Layer** (`infrastructure`): HTTP transport, connection
//!   registry and manager, health monitoring, configuration, logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use mcp_hub::{ConfigLoader, ConnectionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let manager = ConnectionManager::new(&config);
//!     manager.initialize().await;
//!
//!     if let Some(server) = manager.find_tool("search_notes") {
//!         let hits = manager
//!             .call_tool(&server, "search_notes", serde_json::json!({"query": "rust"}))
//!             .await?;
//!         println!("{hits}");
//!     }
//!
//!     manager.disconnect_all().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CapabilitySet, Config, Connection, ConnectionStatus, Envelope, PromptDescriptor,
    ResourceDescriptor, ServerDescriptor, ToolDescriptor, TransportKind,
};
pub use domain::ports::McpTransport;
pub use domain::{format_error_message, McpError, TransportError, TransportErrorKind};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::mcp::{ConnectionManager, ConnectionRegistry, HealthMonitor, HttpTransport};
pub use services::{CircuitBreakerService, RetryPolicy};
