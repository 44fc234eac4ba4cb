//! reqwest-backed JSON transport for HTTP MCP servers.

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::error::{TransportError, TransportErrorKind};
use crate::domain::models::HttpConfig;
use crate::domain::ports::McpTransport;
use crate::domain::text::truncate;

/// Longest error body kept in a status error message.
const MAX_ERROR_BODY: usize = 200;

/// Shared outbound HTTP transport.
///
/// The underlying client is created on first use and dropped by
/// [`McpTransport::close`]; a later request builds a fresh one. Intended to be
/// used from the runtime that owns the manager.
pub struct HttpTransport {
    request_timeout: Duration,
    connect_timeout: Duration,
    client: Mutex<Option<ReqwestClient>>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Self {
        Self::with_timeouts(
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn with_timeouts(request_timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            request_timeout,
            connect_timeout,
            client: Mutex::new(None),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.client.lock().await.is_some()
    }

    async fn client(&self) -> Result<ReqwestClient, TransportError> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = ReqwestClient::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;

        debug!(
            request_timeout_ms = u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
            "Created HTTP client"
        );
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn send(request: RequestBuilder) -> Result<Value, TransportError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                status.canonical_reason().unwrap_or("unexpected status").to_string()
            } else {
                truncate(&body, MAX_ERROR_BODY)
            };
            return Err(TransportError::status(status.as_u16(), message));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::decode(e.to_string()))
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let client = self.client().await?;
        Self::send(client.get(url)).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        let client = self.client().await?;
        Self::send(client.post(url).json(body)).await
    }

    async fn close(&self) {
        if self.client.lock().await.take().is_some() {
            debug!("Closed HTTP client");
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if let Some(status) = err.status() {
        TransportErrorKind::Status(status.as_u16())
    } else if err.is_decode() || err.is_body() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string())
}
