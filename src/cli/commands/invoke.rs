//! Tool calls, resource reads and prompt rendering.
//!
//! Each command routes to the explicitly named server, or to the first
//! connected server advertising the tool, URI or prompt.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, Envelope};
use crate::domain::McpError;
use crate::infrastructure::mcp::ConnectionManager;

#[derive(Debug, Serialize)]
pub struct InvokeOutput {
    pub server: String,
    #[serde(flatten)]
    pub envelope: Envelope,
}

impl CommandOutput for InvokeOutput {
    fn to_human(&self) -> String {
        match &self.envelope.result {
            Some(Value::String(text)) => text.clone(),
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_default(),
            None => String::new(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn call_tool(
    config: &Config,
    tool: &str,
    server: Option<&str>,
    args: &str,
    json_mode: bool,
) -> Result<()> {
    let arguments: Value = serde_json::from_str(args).context("--args must be valid JSON")?;
    if !arguments.is_object() {
        bail!("--args must be a JSON object");
    }

    let manager = super::connect(config).await;
    let result = match route(&manager, server, || manager.find_tool(tool), "tool", tool) {
        Ok(target) => manager
            .call_tool(&target, tool, arguments)
            .await
            .map(|value| (target, value))
            .map_err(|e| anyhow::Error::new(e).context("call_tool")),
        Err(e) => Err(e),
    };
    finish(&manager, result, json_mode).await
}

pub async fn read_resource(
    config: &Config,
    uri: &str,
    server: Option<&str>,
    json_mode: bool,
) -> Result<()> {
    let manager = super::connect(config).await;
    let result = match route(&manager, server, || manager.find_resource(uri), "resource", uri) {
        Ok(target) => manager
            .read_resource(&target, uri)
            .await
            .map(|text| (target, Value::String(text)))
            .map_err(|e| anyhow::Error::new(e).context("read_resource")),
        Err(e) => Err(e),
    };
    finish(&manager, result, json_mode).await
}

pub async fn get_prompt(
    config: &Config,
    name: &str,
    server: Option<&str>,
    args: &[String],
    json_mode: bool,
) -> Result<()> {
    let arguments = parse_prompt_args(args)?;

    let manager = super::connect(config).await;
    let result = match route(&manager, server, || manager.find_prompt(name), "prompt", name) {
        Ok(target) => manager
            .get_prompt(&target, name, arguments)
            .await
            .map(|text| (target, Value::String(text)))
            .map_err(|e| anyhow::Error::new(e).context("get_prompt")),
        Err(e) => Err(e),
    };
    finish(&manager, result, json_mode).await
}

/// Pick the target server for an invocation.
fn route(
    manager: &ConnectionManager,
    explicit: Option<&str>,
    find: impl FnOnce() -> Option<String>,
    what: &str,
    name: &str,
) -> Result<String> {
    if let Some(server) = explicit {
        return Ok(server.to_string());
    }
    match find() {
        Some(server) => Ok(server),
        None if manager.get_all_connections().iter().any(|c| c.is_connected()) => {
            bail!("No connected server offers {what} '{name}'")
        }
        None => Err(anyhow::Error::new(McpError::NotConnected(
            manager
                .servers()
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ))
        .context(format!("routing {what} '{name}'"))),
    }
}

async fn finish(
    manager: &Arc<ConnectionManager>,
    result: Result<(String, Value)>,
    json_mode: bool,
) -> Result<()> {
    manager.disconnect_all().await;

    let (server, value) = result?;
    output(
        &InvokeOutput {
            server,
            envelope: Envelope::ok(value),
        },
        json_mode,
    );
    Ok(())
}

/// Turn repeated `key=value` flags into a JSON object.
fn parse_prompt_args(args: &[String]) -> Result<Value> {
    let mut map = Map::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Invalid prompt argument '{arg}': expected key=value");
        };
        if key.is_empty() {
            bail!("Invalid prompt argument '{arg}': empty key");
        }
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(Value::Object(map))
}
