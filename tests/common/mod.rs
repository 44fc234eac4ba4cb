//! Common test utilities for integration tests
//!
//! Wiremock-backed MCP servers and a fast configuration for driving a real
//! `ConnectionManager` over HTTP.

#![allow(dead_code)]

use mcp_hub::domain::models::{
    BreakerScope, CircuitBreakerConfig, Config, HttpConfig, RetryConfig, ServerDescriptor,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Descriptor pointing at a running mock server.
pub fn descriptor(name: &str, server: &MockServer) -> ServerDescriptor {
    let address = server.address();
    ServerDescriptor::http(name, address.ip().to_string(), address.port())
}

/// Configuration with short timeouts and millisecond backoff.
pub fn fast_config(servers: Vec<ServerDescriptor>) -> Config {
    Config {
        http: HttpConfig {
            request_timeout_secs: 1,
            connect_timeout_secs: 1,
        },
        retry: RetryConfig {
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 50,
            exponential_base: 2.0,
            jitter: false,
        },
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout_secs: 30,
            scope: BreakerScope::Operation,
        },
        servers,
        ..Config::default()
    }
}

/// Mount `/health` and the three listing endpoints.
pub async fn mount_mcp_server(server: &MockServer, tools: Value, resources: Value, prompts: Value) {
    mount_health(server).await;
    mount_listing(server, "tools", tools).await;
    mount_listing(server, "resources", resources).await;
    mount_listing(server, "prompts", prompts).await;
}

pub async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(server)
        .await;
}

pub async fn mount_listing(server: &MockServer, key: &str, items: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{key}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ key: items })))
        .mount(server)
        .await;
}

/// Tool listing with one entry per name.
pub fn tools(names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "description": format!("{name} tool"),
                    "inputSchema": {"type": "object"}
                })
            })
            .collect(),
    )
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
