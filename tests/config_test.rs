//! Loading configuration files and feeding them to the manager.

use std::fs;

use mcp_hub::domain::models::{BreakerScope, RotationPolicy, TransportKind};
use mcp_hub::infrastructure::config::{ConfigError, ConfigLoader};
use mcp_hub::infrastructure::mcp::ConnectionManager;
use mcp_hub::McpError;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
logging:
  level: debug
  format: json
  log_dir: /var/log/mcp-hub
  rotation: hourly
http:
  request_timeout_secs: 5
retry:
  max_attempts: 5
  base_delay_ms: 200
  max_delay_ms: 2000
  jitter: false
circuit_breaker:
  failure_threshold: 4
  recovery_timeout_secs: 10
  scope: server
health:
  check_interval_secs: 15
servers:
  - name: personal_assistant
    transport: http
    host: 127.0.0.1
    port: 8001
  - name: local_tools
    transport: stdio
    command: mcp-local-tools
    args: ["--verbose"]
"#;

#[test]
fn test_load_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hub.yaml");
    fs::write(&path, FULL_CONFIG).unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.rotation, RotationPolicy::Hourly);
    assert_eq!(config.http.request_timeout_secs, 5);
    // Unspecified fields keep their defaults
    assert_eq!(config.http.connect_timeout_secs, 10);
    assert_eq!(config.retry.max_attempts, 5);
    assert!((config.retry.exponential_base - 2.0).abs() < f64::EPSILON);
    assert_eq!(config.circuit_breaker.scope, BreakerScope::Server);
    assert_eq!(config.health.check_interval_secs, 15);
    assert_eq!(config.health.refresh_interval_secs, 300);

    assert_eq!(config.servers.len(), 2);
    assert_eq!(config.servers[1].transport, TransportKind::Stdio);
    assert_eq!(config.servers[1].command.as_deref(), Some("mcp-local-tools"));
    assert_eq!(config.servers[1].args, vec!["--verbose"]);
}

#[test]
fn test_invalid_file_reports_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hub.yaml");
    fs::write(
        &path,
        r"
servers:
  - name: kb
    host: 127.0.0.1
    port: 8002
  - name: kb
    host: 127.0.0.1
    port: 8003
",
    )
    .unwrap();

    let err = ConfigLoader::load_from_file(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::DuplicateServerName(name)) if name == "kb"
    ));
}

#[tokio::test]
async fn test_stdio_server_from_config_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hub.yaml");
    fs::write(
        &path,
        r#"
servers:
  - name: local_tools
    transport: stdio
    command: mcp-local-tools
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let manager = ConnectionManager::new(&config);

    assert_eq!(manager.initialize().await, 0);
    let err = manager
        .connect_server(&config.servers[0])
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::UnsupportedTransport { .. }));

    let status = manager.get_connection_status("local_tools").unwrap();
    assert!(status
        .error_message
        .unwrap()
        .contains("unsupported transport: stdio"));
}
