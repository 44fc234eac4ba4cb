//! Infrastructure layer module
//!
//! This module contains the adapters around the domain layer:
//! - MCP integration (HTTP transport, connection manager, health monitor)
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod mcp;
