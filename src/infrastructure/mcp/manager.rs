//! Multi-server MCP connection manager.
//!
//! Owns the connection registry and the shared transport, and drives
//! connect, introspection, health checks, calls and teardown for every
//! configured server. Introspection runs under the [`RetryPolicy`]; tool,
//! resource and prompt calls run under the [`CircuitBreakerService`].

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::domain::error::{McpError, TransportError, TransportErrorKind};
use crate::domain::models::{
    CapabilitySet, Config, Connection, ConnectionStatus, PromptDescriptor, ResourceDescriptor,
    ServerDescriptor, ToolDescriptor, TransportKind,
};
use crate::domain::ports::McpTransport;
use crate::infrastructure::mcp::registry::ConnectionRegistry;
use crate::infrastructure::mcp::transport::HttpTransport;
use crate::services::circuit_breaker::{with_circuit_breaker, CircuitBreakerService, CircuitStats};
use crate::services::retry::RetryPolicy;

/// Per-server capability listing, in server configuration order.
pub type ServerListing<T> = Vec<(String, Vec<T>)>;

/// Settles a record to `error` if the operation driving it is dropped mid-flight.
struct InterruptGuard<'a> {
    registry: &'a ConnectionRegistry,
    server: &'a str,
    message: &'static str,
    armed: bool,
}

impl<'a> InterruptGuard<'a> {
    fn new(registry: &'a ConnectionRegistry, server: &'a str, message: &'static str) -> Self {
        Self {
            registry,
            server,
            message,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.degrade_if_live(self.server, self.message);
        }
    }
}

/// Connection manager for a fixed set of MCP servers.
///
/// Construct once per process and share behind an `Arc`. Connect and
/// disconnect are serialized by a lifecycle lock; calls, refreshes and
/// health checks run concurrently and only touch the registry through
/// short, non-async critical sections.
pub struct ConnectionManager {
    servers: Vec<ServerDescriptor>,
    registry: ConnectionRegistry,
    transport: Arc<dyn McpTransport>,
    retry: RetryPolicy,
    breakers: CircuitBreakerService,
    lifecycle: Mutex<()>,
}

impl ConnectionManager {
    /// Build a manager using the HTTP transport.
    pub fn new(config: &Config) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new(&config.http)))
    }

    /// Build a manager on top of any transport.
    pub fn with_transport(config: &Config, transport: Arc<dyn McpTransport>) -> Self {
        Self {
            servers: config.servers.clone(),
            registry: ConnectionRegistry::new(),
            transport,
            retry: RetryPolicy::from_config(&config.retry),
            breakers: CircuitBreakerService::new(config.circuit_breaker.clone()),
            lifecycle: Mutex::new(()),
        }
    }

    /// Configured servers, in routing order.
    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    /// Connect every configured server.
    ///
    /// A failing server is logged and left in `error`; it never aborts the
    /// others. Returns the number of servers that ended up connected.
    pub async fn initialize(&self) -> usize {
        info!(servers = self.servers.len(), "Initializing MCP connections");

        let mut connected = 0;
        for descriptor in &self.servers {
            match self.connect_server(descriptor).await {
                Ok(()) => connected += 1,
                Err(e) => error!(
                    server_name = %descriptor.name,
                    error = %e,
                    "Failed to connect to MCP server"
                ),
            }
        }

        info!(
            connected,
            total = self.servers.len(),
            "MCP connection initialization complete"
        );
        connected
    }

    /// Connect one server: health check, then introspection.
    ///
    /// The record is created or overwritten in `connecting` state and ends
    /// in `connected` only when both steps succeed; otherwise it is left in
    /// `error` carrying the failure message, and the error is returned.
    pub async fn connect_server(&self, descriptor: &ServerDescriptor) -> Result<(), McpError> {
        let _lifecycle = self.lifecycle.lock().await;
        let name = descriptor.name.as_str();

        self.registry.begin_connect(descriptor);
        let mut guard = InterruptGuard::new(&self.registry, name, "connection attempt cancelled");

        let result = self
            .establish(descriptor)
            .instrument(info_span!("connect", server_name = %name))
            .await;
        guard.disarm();

        match result {
            Ok(capabilities) => {
                let (tools, resources, prompts) = (
                    capabilities.tools.len(),
                    capabilities.resources.len(),
                    capabilities.prompts.len(),
                );
                self.registry.replace_capabilities(name, capabilities);
                self.registry.mark_connected(name);
                info!(
                    server_name = %name,
                    tools,
                    resources,
                    prompts,
                    "Connected to MCP server"
                );
                Ok(())
            }
            Err(e) => {
                self.registry.degrade(name, &e.to_string());
                Err(e)
            }
        }
    }

    async fn establish(&self, descriptor: &ServerDescriptor) -> Result<CapabilitySet, McpError> {
        let name = descriptor.name.as_str();

        if descriptor.transport != TransportKind::Http {
            return Err(McpError::UnsupportedTransport {
                server: name.to_string(),
                transport: descriptor.transport,
            });
        }

        let base_url = descriptor.base_url().ok_or_else(|| {
            McpError::transport(
                name,
                TransportError::new(TransportErrorKind::Other, "no host or port configured"),
            )
        })?;

        debug!(url = %base_url, "Checking MCP server health");
        self.ping(name, &base_url).await?;
        self.introspect(name, &base_url).await
    }

    async fn ping(&self, name: &str, base_url: &str) -> Result<(), McpError> {
        self.transport
            .get_json(&format!("{base_url}/health"))
            .await
            .map(|_| ())
            .map_err(|e| McpError::transport(name, e))
    }

    /// Fetch tools, resources and prompts under the retry policy.
    ///
    /// Nothing is written here; callers swap the returned set into the
    /// registry only when all three listings succeeded.
    async fn introspect(&self, name: &str, base_url: &str) -> Result<CapabilitySet, McpError> {
        self.retry
            .execute(|| async move {
                let tools: Vec<ToolDescriptor> = self.list(name, base_url, "tools").await?;
                let resources: Vec<ResourceDescriptor> =
                    self.list(name, base_url, "resources").await?;
                let prompts: Vec<PromptDescriptor> = self.list(name, base_url, "prompts").await?;
                Ok(CapabilitySet::new(tools, resources, prompts))
            })
            .instrument(info_span!("introspect", server_name = %name))
            .await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        name: &str,
        base_url: &str,
        key: &str,
    ) -> Result<Vec<T>, McpError> {
        let body = self
            .transport
            .get_json(&format!("{base_url}/{key}"))
            .await
            .map_err(|e| McpError::transport(name, e))?;

        match body.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(items) => serde_json::from_value(items.clone())
                .map_err(|e| McpError::decode(name, format!("invalid '{key}' listing: {e}"))),
        }
    }

    /// Explicit teardown of one server.
    ///
    /// The record survives as `disconnected`; its base URL and capability
    /// cache are dropped.
    pub async fn disconnect_server(&self, name: &str) -> Result<(), McpError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.registry.disconnect(name) {
            info!(server_name = %name, "Disconnected from MCP server");
            Ok(())
        } else {
            Err(McpError::ServerNotFound(name.to_string()))
        }
    }

    /// Disconnect every server, then release the shared transport.
    pub async fn disconnect_all(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        for name in self.registry.names() {
            self.registry.disconnect(&name);
        }
        self.transport.close().await;
        info!("Disconnected from all MCP servers");
    }

    /// Call a tool on a connected server and return its `result`.
    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, McpError> {
        let payload = json!({ "name": tool, "arguments": arguments });
        let mut response = self.invoke(server, "call_tool", "tools/call", &payload).await?;
        Ok(take_field(&mut response, "result").unwrap_or_else(|| Value::String(String::new())))
    }

    /// Read a resource from a connected server and return its `content`.
    pub async fn read_resource(&self, server: &str, uri: &str) -> Result<String, McpError> {
        let payload = json!({ "uri": uri });
        let mut response = self
            .invoke(server, "read_resource", "resources/read", &payload)
            .await?;
        Ok(text_field(&mut response, "content"))
    }

    /// Render a prompt on a connected server and return its text.
    pub async fn get_prompt(
        &self,
        server: &str,
        name: &str,
        arguments: Value,
    ) -> Result<String, McpError> {
        let payload = json!({ "name": name, "arguments": arguments });
        let mut response = self
            .invoke(server, "get_prompt", "prompts/get", &payload)
            .await?;
        Ok(text_field(&mut response, "prompt"))
    }

    /// POST a call envelope to a connected server under its circuit breaker.
    async fn invoke(
        &self,
        server: &str,
        operation: &str,
        path: &str,
        payload: &Value,
    ) -> Result<Value, McpError> {
        let base_url = self.require_connected(server)?;
        let scope = self.breakers.scope_for(operation, server);
        let url = format!("{base_url}/{path}");

        with_circuit_breaker(&self.breakers, scope, async {
            let response = match self.transport.post_json(&url, payload).await {
                Ok(response) => response,
                Err(e) => return Err(self.demote_after_call(McpError::transport(server, e))),
            };

            match response.get("success").and_then(Value::as_bool) {
                Some(true) => {
                    self.registry.touch(server);
                    Ok(response)
                }
                Some(false) => {
                    self.registry.touch(server);
                    let message = response
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown error")
                        .to_string();
                    Err(McpError::Application {
                        server: server.to_string(),
                        message,
                    })
                }
                None => Err(self.demote_after_call(McpError::decode(
                    server,
                    "response has no boolean 'success' field",
                ))),
            }
        })
        .instrument(info_span!("call", operation, server_name = %server))
        .await
    }

    fn demote_after_call(&self, err: McpError) -> McpError {
        if let McpError::Transport { server, .. } | McpError::Decode { server, .. } = &err {
            if self.registry.degrade_if_live(server, &err.to_string()) {
                warn!(server_name = %server, error = %err, "Call failed, marking server as errored");
            }
        }
        err
    }

    fn require_connected(&self, server: &str) -> Result<String, McpError> {
        match self.registry.get(server) {
            Some(Connection {
                status: ConnectionStatus::Connected,
                base_url: Some(base_url),
                ..
            }) => Ok(base_url),
            _ => Err(McpError::NotConnected(server.to_string())),
        }
    }

    /// Re-run introspection for one server, or for every connected server.
    ///
    /// A single-server refresh returns its failure; a bulk refresh logs
    /// per-server failures and carries on. Refreshing a server that is not
    /// connected does nothing.
    pub async fn refresh_capabilities(&self, server: Option<&str>) -> Result<(), McpError> {
        match server {
            Some(name) => match self.registry.status(name) {
                None => Err(McpError::ServerNotFound(name.to_string())),
                Some(ConnectionStatus::Connected) => self.refresh_one(name).await,
                Some(status) => {
                    debug!(server_name = %name, %status, "Skipping refresh of unconnected server");
                    Ok(())
                }
            },
            None => {
                let names = self.registry.names_with_status(ConnectionStatus::Connected);
                let results = join_all(names.iter().map(|name| self.refresh_one(name))).await;
                for (name, result) in names.iter().zip(results) {
                    if let Err(e) = result {
                        error!(server_name = %name, error = %e, "Failed to refresh capabilities");
                    }
                }
                Ok(())
            }
        }
    }

    async fn refresh_one(&self, name: &str) -> Result<(), McpError> {
        let base_url = self
            .registry
            .base_url(name)
            .ok_or_else(|| McpError::NotConnected(name.to_string()))?;
        let capabilities = self.introspect(name, &base_url).await?;
        if self.registry.replace_capabilities(name, capabilities) {
            debug!(server_name = %name, "Refreshed capabilities");
        }
        Ok(())
    }

    /// Re-check the health endpoint of every connected server.
    ///
    /// A failed check demotes the server to `error` but keeps its base URL
    /// and capability cache. Returns the names of servers that failed.
    pub async fn health_check(&self) -> Vec<String> {
        let names = self.registry.names_with_status(ConnectionStatus::Connected);
        let results = join_all(names.iter().map(|name| self.check_one(name))).await;

        names
            .into_iter()
            .zip(results)
            .filter_map(|(name, healthy)| (!healthy).then_some(name))
            .collect()
    }

    async fn check_one(&self, name: &str) -> bool {
        let Some(base_url) = self.registry.base_url(name) else {
            return false;
        };

        let mut guard = InterruptGuard::new(&self.registry, name, "health check cancelled");
        let result = self.ping(name, &base_url).await;
        guard.disarm();

        match result {
            Ok(()) => {
                self.registry.touch(name);
                true
            }
            Err(e) => {
                warn!(server_name = %name, error = %e, "Health check failed");
                self.registry.degrade_if_live(name, &e.to_string());
                false
            }
        }
    }

    pub fn get_connection_status(&self, name: &str) -> Option<Connection> {
        self.registry.get(name)
    }

    pub fn get_all_connections(&self) -> Vec<Connection> {
        self.registry.all()
    }

    pub fn is_server_connected(&self, name: &str) -> bool {
        self.registry.status(name) == Some(ConnectionStatus::Connected)
    }

    /// Cached capabilities for a server, empty when none were ever fetched.
    pub fn get_server_capabilities(&self, name: &str) -> Arc<CapabilitySet> {
        self.registry.capabilities(name).unwrap_or_default()
    }

    /// Every cached capability set, whatever the server's status.
    pub fn get_all_capabilities(&self) -> Vec<(String, Arc<CapabilitySet>)> {
        self.registry.all_capabilities()
    }

    pub fn get_available_tools(&self) -> ServerListing<ToolDescriptor> {
        self.listing(|caps| caps.tools.clone())
    }

    pub fn get_available_resources(&self) -> ServerListing<ResourceDescriptor> {
        self.listing(|caps| caps.resources.clone())
    }

    pub fn get_available_prompts(&self) -> ServerListing<PromptDescriptor> {
        self.listing(|caps| caps.prompts.clone())
    }

    fn listing<T>(&self, select: impl Fn(&CapabilitySet) -> Vec<T>) -> ServerListing<T> {
        self.registry
            .connected_capabilities()
            .into_iter()
            .map(|(name, caps)| (name, select(&caps)))
            .collect()
    }

    /// First connected server, in configuration order, advertising `tool`.
    pub fn find_tool(&self, tool: &str) -> Option<String> {
        self.find(|caps| caps.has_tool(tool))
    }

    pub fn find_resource(&self, uri: &str) -> Option<String> {
        self.find(|caps| caps.has_resource(uri))
    }

    pub fn find_prompt(&self, prompt: &str) -> Option<String> {
        self.find(|caps| caps.has_prompt(prompt))
    }

    fn find(&self, matches: impl Fn(&CapabilitySet) -> bool) -> Option<String> {
        self.registry
            .connected_capabilities()
            .into_iter()
            .find(|(_, caps)| matches(caps))
            .map(|(name, _)| name)
    }

    pub fn circuit_stats(&self) -> Vec<CircuitStats> {
        self.breakers.stats()
    }
}

fn take_field(response: &mut Value, key: &str) -> Option<Value> {
    response.as_object_mut().and_then(|obj| obj.remove(key))
}

fn text_field(response: &mut Value, key: &str) -> String {
    match take_field(response, key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    }
}
