//! Capability descriptors advertised by MCP servers.
//!
//! Field names follow the wire format of the server endpoints (`inputSchema`,
//! `mimeType`), so these types decode straight from `/tools`, `/resources`
//! and `/prompts` responses.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Servers send `null` for unset optional fields; treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A tool a server can execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
}

/// A readable resource exposed by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A single argument accepted by a prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,
}

/// A prompt template a server can render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: Vec<PromptArgument>,
}

/// Snapshot of everything a server advertised during one introspection.
///
/// Always replaced as a whole; never merged with an earlier snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub tools: Vec<ToolDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
}

impl CapabilitySet {
    pub fn new(
        tools: Vec<ToolDescriptor>,
        resources: Vec<ResourceDescriptor>,
        prompts: Vec<PromptDescriptor>,
    ) -> Self {
        Self {
            tools,
            resources,
            prompts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty() && self.prompts.is_empty()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    pub fn has_resource(&self, uri: &str) -> bool {
        self.resources.iter().any(|r| r.uri == uri)
    }

    pub fn has_prompt(&self, name: &str) -> bool {
        self.prompts.iter().any(|p| p.name == name)
    }
}
