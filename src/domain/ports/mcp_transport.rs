use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::TransportError;

/// Port for the outbound JSON transport shared by every server connection.
///
/// Implementations must apply their own per-request timeout so that a slow
/// server never stalls calls to another one.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// `GET url`, requiring a 2xx status and a JSON body.
    async fn get_json(&self, url: &str) -> Result<Value, TransportError>;

    /// `POST url` with a JSON body, requiring a 2xx status and a JSON body.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError>;

    /// Release pooled resources. The next request may lazily recreate them.
    async fn close(&self);
}
