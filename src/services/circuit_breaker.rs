//! Circuit breaker pattern for remote MCP calls.
//!
//! Detects repeated transport failures against a call path and rejects
//! further calls until a recovery timeout has passed, then lets exactly one
//! trial call decide whether the circuit closes again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::error::McpError;
use crate::domain::models::{BreakerScope, CircuitBreakerConfig};

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through, failures are counted.
    Closed,
    /// Calls are rejected without being attempted.
    Open,
    /// One trial call is testing recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Key a circuit is tracked under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitScope {
    /// Shared by every server reached through this operation.
    Operation(String),
    /// One operation against one server.
    Endpoint { operation: String, server: String },
}

impl CircuitScope {
    pub fn operation(name: impl Into<String>) -> Self {
        Self::Operation(name.into())
    }

    pub fn endpoint(operation: impl Into<String>, server: impl Into<String>) -> Self {
        Self::Endpoint {
            operation: operation.into(),
            server: server.into(),
        }
    }
}

impl fmt::Display for CircuitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(op) => write!(f, "operation '{op}'"),
            Self::Endpoint { operation, server } => {
                write!(f, "operation '{operation}' on server '{server}'")
            }
        }
    }
}

/// Individual circuit breaker state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    pub scope: CircuitScope,
    pub state: CircuitState,
    /// Consecutive failures since the last success
    pub consecutive_failures: u32,
    /// Wall-clock time of the last failure, for reporting
    pub last_failure_at: Option<DateTime<Utc>>,
    pub state_changed_at: DateTime<Utc>,
    /// Total times the circuit opened
    pub open_count: u32,
    last_failure: Option<Instant>,
    trial_in_flight: bool,
}

impl CircuitBreaker {
    pub fn new(scope: CircuitScope) -> Self {
        Self {
            scope,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            state_changed_at: Utc::now(),
            open_count: 0,
            last_failure: None,
            trial_in_flight: false,
        }
    }

    /// Record a failure. Returns true when this failure opened the circuit.
    pub fn record_failure(&mut self, failure_threshold: u32) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(Instant::now());
        self.last_failure_at = Some(Utc::now());

        match self.state {
            CircuitState::Closed if self.consecutive_failures >= failure_threshold => {
                self.open();
                true
            }
            CircuitState::HalfOpen => {
                self.open();
                true
            }
            _ => false,
        }
    }

    /// Record a success. Closes a half-open circuit.
    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::HalfOpen => self.close(),
            CircuitState::Closed => self.consecutive_failures = 0,
            CircuitState::Open => {}
        }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.state_changed_at = Utc::now();
        self.trial_in_flight = false;
        self.open_count += 1;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.state_changed_at = Utc::now();
        self.trial_in_flight = false;
        self.consecutive_failures = 0;
    }

    fn half_open(&mut self) {
        self.state = CircuitState::HalfOpen;
        self.state_changed_at = Utc::now();
        self.trial_in_flight = false;
    }

    /// Time left before an open circuit admits a trial call.
    fn remaining(&self, recovery_timeout: Duration) -> Duration {
        self.last_failure
            .map_or(Duration::ZERO, |at| recovery_timeout.saturating_sub(at.elapsed()))
    }

    /// Decide whether a call may proceed, moving `open` to `half_open` once
    /// the recovery timeout has passed since the last failure.
    pub fn allows(&mut self, recovery_timeout: Duration) -> bool {
        if self.state == CircuitState::Open {
            let expired = self
                .last_failure
                .is_none_or(|at| at.elapsed() > recovery_timeout);
            if !expired {
                return false;
            }
            self.half_open();
        }

        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen if !self.trial_in_flight => {
                self.trial_in_flight = true;
                true
            }
            _ => false,
        }
    }
}

/// Result of a circuit breaker check.
#[derive(Debug, Clone)]
pub enum CircuitCheckResult {
    /// Request is allowed.
    Allowed,
    /// Request is the single trial of a half-open circuit.
    Testing,
    /// Request is blocked by an open circuit.
    Blocked { retry_after: DateTime<Utc> },
}

impl CircuitCheckResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed | Self::Testing)
    }
}

/// Statistics for a circuit breaker.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStats {
    pub scope: String,
    pub state: String,
    pub consecutive_failures: u32,
    pub open_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub state_changed_at: DateTime<Utc>,
}

/// Service owning every circuit of a manager.
pub struct CircuitBreakerService {
    config: CircuitBreakerConfig,
    circuits: Mutex<HashMap<CircuitScope, CircuitBreaker>>,
}

impl CircuitBreakerService {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.config.recovery_timeout_secs)
    }

    fn circuits(&self) -> MutexGuard<'_, HashMap<CircuitScope, CircuitBreaker>> {
        self.circuits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scope for `operation` against `server` under the configured keying.
    pub fn scope_for(&self, operation: &str, server: &str) -> CircuitScope {
        match self.config.scope {
            BreakerScope::Operation => CircuitScope::operation(operation),
            BreakerScope::Server => CircuitScope::endpoint(operation, server),
        }
    }

    /// Check if a request is allowed for the given scope.
    pub fn check(&self, scope: &CircuitScope) -> CircuitCheckResult {
        let recovery_timeout = self.recovery_timeout();
        let mut circuits = self.circuits();
        let circuit = circuits
            .entry(scope.clone())
            .or_insert_with(|| CircuitBreaker::new(scope.clone()));

        if circuit.allows(recovery_timeout) {
            if circuit.state == CircuitState::HalfOpen {
                info!(scope = %scope, "Circuit half-open, allowing trial call");
                CircuitCheckResult::Testing
            } else {
                CircuitCheckResult::Allowed
            }
        } else {
            let remaining = chrono::Duration::from_std(circuit.remaining(recovery_timeout))
                .unwrap_or_else(|_| chrono::Duration::zero());
            CircuitCheckResult::Blocked {
                retry_after: Utc::now() + remaining,
            }
        }
    }

    /// Record a failure for the given scope.
    pub fn record_failure(&self, scope: &CircuitScope, error: &str) {
        let mut circuits = self.circuits();
        let circuit = circuits
            .entry(scope.clone())
            .or_insert_with(|| CircuitBreaker::new(scope.clone()));

        if circuit.record_failure(self.config.failure_threshold) {
            warn!(
                scope = %scope,
                consecutive_failures = circuit.consecutive_failures,
                open_count = circuit.open_count,
                error = %error,
                "Circuit breaker opened"
            );
        } else {
            debug!(
                scope = %scope,
                consecutive_failures = circuit.consecutive_failures,
                "Circuit breaker recorded failure"
            );
        }
    }

    /// Record a success for the given scope.
    pub fn record_success(&self, scope: &CircuitScope) {
        let mut circuits = self.circuits();
        if let Some(circuit) = circuits.get_mut(scope) {
            let was_half_open = circuit.state == CircuitState::HalfOpen;
            circuit.record_success();
            if was_half_open {
                info!(scope = %scope, "Circuit breaker closed after successful trial");
            }
        }
    }

    /// Free the trial slot of a half-open circuit whose trial never finished.
    fn abandon_trial(&self, scope: &CircuitScope) {
        let mut circuits = self.circuits();
        if let Some(circuit) = circuits.get_mut(scope) {
            if circuit.state == CircuitState::HalfOpen {
                circuit.trial_in_flight = false;
            }
        }
    }

    /// Get the state of a circuit.
    pub fn get_state(&self, scope: &CircuitScope) -> Option<CircuitState> {
        self.circuits().get(scope).map(|c| c.state)
    }

    /// Get statistics for all circuits, ordered by scope.
    pub fn stats(&self) -> Vec<CircuitStats> {
        let mut stats: Vec<CircuitStats> = self
            .circuits()
            .values()
            .map(|c| CircuitStats {
                scope: c.scope.to_string(),
                state: c.state.as_str().to_string(),
                consecutive_failures: c.consecutive_failures,
                open_count: c.open_count,
                last_failure_at: c.last_failure_at,
                state_changed_at: c.state_changed_at,
            })
            .collect();
        stats.sort_by(|a, b| a.scope.cmp(&b.scope));
        stats
    }
}

/// Releases a half-open trial slot if the protected future is dropped.
struct TrialGuard<'a> {
    service: &'a CircuitBreakerService,
    scope: &'a CircuitScope,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.service.abandon_trial(self.scope);
        }
    }
}

/// Execute a future with circuit breaker protection.
///
/// Failures for which [`McpError::trips_breaker`] holds are counted,
/// including application errors reported by the server. Anything else
/// counts as a success.
pub async fn with_circuit_breaker<F, T>(
    service: &CircuitBreakerService,
    scope: CircuitScope,
    f: F,
) -> Result<T, McpError>
where
    F: Future<Output = Result<T, McpError>>,
{
    let check = service.check(&scope);
    if let CircuitCheckResult::Blocked { retry_after } = check {
        debug!(scope = %scope, %retry_after, "Call rejected by open circuit");
        return Err(McpError::CircuitOpen {
            scope: scope.to_string(),
            retry_after,
        });
    }

    let mut guard = TrialGuard {
        service,
        scope: &scope,
        armed: matches!(check, CircuitCheckResult::Testing),
    };

    let result = f.await;
    guard.armed = false;

    match &result {
        Err(e) if e.trips_breaker() => service.record_failure(&scope, &e.to_string()),
        _ => service.record_success(&scope),
    }
    result
}
