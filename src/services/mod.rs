//! Resilience services used by the connection manager.

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{
    with_circuit_breaker, CircuitBreaker, CircuitBreakerService, CircuitCheckResult, CircuitScope,
    CircuitState, CircuitStats,
};
pub use retry::RetryPolicy;
