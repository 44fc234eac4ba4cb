pub mod capability;
pub mod config;
pub mod connection;
pub mod envelope;
pub mod server;

pub use capability::{
    CapabilitySet, PromptArgument, PromptDescriptor, ResourceDescriptor, ToolDescriptor,
};
pub use config::{
    BreakerScope, CircuitBreakerConfig, Config, HealthConfig, HttpConfig, LoggingConfig,
    RetryConfig, RotationPolicy,
};
pub use connection::{Connection, ConnectionStatus};
pub use envelope::Envelope;
pub use server::{ServerDescriptor, TransportKind};
