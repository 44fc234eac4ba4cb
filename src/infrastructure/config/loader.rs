use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::{Config, TransportKind};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid {0}: must be greater than 0")]
    ZeroTimeout(&'static str),

    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error("Invalid base_delay_ms: {0}. Must be greater than 0")]
    InvalidBaseDelay(u64),

    #[error("Invalid backoff configuration: max_delay_ms ({1}) must be >= base_delay_ms ({0})")]
    InvalidBackoff(u64, u64),

    #[error("Invalid exponential_base: {0}. Must be greater than 1")]
    InvalidExponentialBase(f64),

    #[error("Invalid failure_threshold: {0}. Must be at least 1")]
    InvalidFailureThreshold(u32),

    #[error("Server name cannot be empty")]
    EmptyServerName,

    #[error("Duplicate server name: {0}")]
    DuplicateServerName(String),

    #[error("HTTP server '{0}' requires both host and port")]
    MissingHostPort(String),

    #[error("Stdio server '{0}' requires a command")]
    MissingCommand(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the current directory
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .mcp-hub/config.yaml (project config)
    /// 3. .mcp-hub/local.yaml (local overrides, optional)
    /// 4. Environment variables (`MCP_HUB_*` prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Load configuration rooted at `dir` instead of the current directory
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let project = dir.as_ref().join(".mcp-hub");
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(project.join("config.yaml")))
            .merge(Yaml::file(project.join("local.yaml")))
            .merge(Env::prefixed("MCP_HUB_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file over the defaults
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.http.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("http.request_timeout_secs"));
        }
        if config.http.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("http.connect_timeout_secs"));
        }
        if config.health.check_interval_secs == 0 {
            return Err(ConfigError::ZeroTimeout("health.check_interval_secs"));
        }
        if config.health.refresh_interval_secs == 0 {
            return Err(ConfigError::ZeroTimeout("health.refresh_interval_secs"));
        }

        let retry = &config.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(retry.max_attempts));
        }
        if retry.base_delay_ms == 0 {
            return Err(ConfigError::InvalidBaseDelay(retry.base_delay_ms));
        }
        if retry.max_delay_ms < retry.base_delay_ms {
            return Err(ConfigError::InvalidBackoff(
                retry.base_delay_ms,
                retry.max_delay_ms,
            ));
        }
        if !(retry.exponential_base.is_finite() && retry.exponential_base > 1.0) {
            return Err(ConfigError::InvalidExponentialBase(retry.exponential_base));
        }

        if config.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold(
                config.circuit_breaker.failure_threshold,
            ));
        }

        let mut seen = HashSet::new();
        for server in &config.servers {
            if server.name.trim().is_empty() {
                return Err(ConfigError::EmptyServerName);
            }
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::DuplicateServerName(server.name.clone()));
            }
            match server.transport {
                TransportKind::Http => {
                    let has_host = server.host.as_deref().is_some_and(|h| !h.is_empty());
                    if !has_host || server.port.is_none() {
                        return Err(ConfigError::MissingHostPort(server.name.clone()));
                    }
                }
                TransportKind::Stdio => {
                    if server.command.as_deref().is_none_or(str::is_empty) {
                        return Err(ConfigError::MissingCommand(server.name.clone()));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BreakerScope, RotationPolicy, ServerDescriptor};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.retry.max_delay_ms, 30_000);
        assert!(config.retry.jitter);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.recovery_timeout_secs, 30);
        assert_eq!(config.circuit_breaker.scope, BreakerScope::Operation);
        assert_eq!(config.http.request_timeout_secs, 30);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].name, "personal_assistant");
        assert_eq!(config.servers[1].port, Some(8002));
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
logging:
  level: debug
  format: json
  rotation: hourly
retry:
  max_attempts: 5
  jitter: false
circuit_breaker:
  scope: server
servers:
  - name: tasks
    host: 10.0.0.5
    port: 9000
  - name: local
    transport: stdio
    command: python
    args: [server.py]
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.rotation, RotationPolicy::Hourly);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert!(!config.retry.jitter);
        assert_eq!(config.circuit_breaker.scope, BreakerScope::Server);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].transport, TransportKind::Http);
        assert_eq!(config.servers[1].args, vec!["server.py"]);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.http.request_timeout_secs = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ZeroTimeout("http.request_timeout_secs")
        ));
    }

    #[test]
    fn test_validate_retry() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxAttempts(0)
        ));

        let mut config = Config::default();
        config.retry.base_delay_ms = 5000;
        config.retry.max_delay_ms = 1000;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBackoff(5000, 1000)
        ));

        let mut config = Config::default();
        config.retry.exponential_base = 1.0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidExponentialBase(_)
        ));
    }

    #[test]
    fn test_validate_zero_failure_threshold() {
        let mut config = Config::default();
        config.circuit_breaker.failure_threshold = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidFailureThreshold(0)
        ));
    }

    #[test]
    fn test_validate_servers() {
        let mut config = Config::default();
        config
            .servers
            .push(ServerDescriptor::http("personal_assistant", "127.0.0.1", 9000));
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::DuplicateServerName(name) if name == "personal_assistant"
        ));

        let mut config = Config::default();
        config.servers[0].port = None;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::MissingHostPort(_)
        ));

        let mut config = Config::default();
        config.servers = vec![ServerDescriptor::stdio("local", "", Vec::new())];
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::MissingCommand(_)
        ));

        let mut config = Config::default();
        config.servers[1].name = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyServerName
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".mcp-hub");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("config.yaml"),
            "logging:\n  level: info\n  format: json\nretry:\n  max_attempts: 4\n",
        )
        .unwrap();
        fs::write(project.join("local.yaml"), "logging:\n  level: debug\n").unwrap();

        let config = temp_env::with_vars_unset(
            ["MCP_HUB_LOGGING__LEVEL", "MCP_HUB_RETRY__MAX_ATTEMPTS"],
            || ConfigLoader::load_from_dir(dir.path()).unwrap(),
        );

        assert_eq!(config.logging.level, "debug", "Override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.servers.len(), 2);
    }

    #[test]
    fn test_env_override() {
        let dir = TempDir::new().unwrap();

        let config = temp_env::with_vars(
            [
                ("MCP_HUB_RETRY__MAX_ATTEMPTS", Some("7")),
                ("MCP_HUB_CIRCUIT_BREAKER__SCOPE", Some("server")),
                ("MCP_HUB_LOGGING__LEVEL", Some("warn")),
            ],
            || ConfigLoader::load_from_dir(dir.path()).unwrap(),
        );

        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.circuit_breaker.scope, BreakerScope::Server);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hub.yaml");
        fs::write(&path, "retry:\n  max_attempts: 0\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ConfigLoader::load_from_file("/nonexistent/hub.yaml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
