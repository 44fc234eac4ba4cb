use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::server::ServerDescriptor;

/// Main configuration structure for mcp-hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry policy for introspection
    #[serde(default)]
    pub retry: RetryConfig,

    /// Circuit breaker settings for tool/resource/prompt calls
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Scheduled health check and refresh
    #[serde(default)]
    pub health: HealthConfig,

    /// MCP servers, in routing order
    #[serde(default = "default_servers")]
    pub servers: Vec<ServerDescriptor>,
}

fn default_servers() -> Vec<ServerDescriptor> {
    vec![
        ServerDescriptor::http("personal_assistant", "127.0.0.1", 8001),
        ServerDescriptor::http("knowledge_base", "127.0.0.1", 8002),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            health: HealthConfig::default(),
            servers: default_servers(),
        }
    }
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for JSON log files (console only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log file rotation
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays
    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,

    /// Scale each delay by a random factor in [0.5, 1.0]
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    1000
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_exponential_base() -> f64 {
    2.0
}

const fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            exponential_base: default_exponential_base(),
            jitter: default_jitter(),
        }
    }
}

/// What a circuit breaker is keyed on
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    /// One circuit per operation, shared by every server
    #[default]
    Operation,
    /// One circuit per (operation, server) pair
    Server,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds after the last failure before a trial call is allowed
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,

    /// Circuit keying
    #[serde(default)]
    pub scope: BreakerScope,
}

const fn default_failure_threshold() -> u32 {
    3
}

const fn default_recovery_timeout_secs() -> u64 {
    30
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            scope: BreakerScope::default(),
        }
    }
}

/// Scheduled maintenance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthConfig {
    /// Seconds between health passes
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Seconds between capability refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

const fn default_check_interval_secs() -> u64 {
    30
}

const fn default_refresh_interval_secs() -> u64 {
    300
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}
