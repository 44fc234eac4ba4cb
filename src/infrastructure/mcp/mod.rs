//! MCP (Model Context Protocol) infrastructure module
//!
//! - `HttpTransport` - reqwest-backed JSON transport shared by all servers
//! - `ConnectionRegistry` - per-server connection records and capability cache
//! - `ConnectionManager` - connect, introspect, health-check, call, disconnect
//! - `HealthMonitor` - scheduled health checks and capability refreshes

pub mod health_monitor;
pub mod manager;
pub mod registry;
pub mod transport;

pub use health_monitor::HealthMonitor;
pub use manager::{ConnectionManager, ServerListing};
pub use registry::ConnectionRegistry;
pub use transport::HttpTransport;
