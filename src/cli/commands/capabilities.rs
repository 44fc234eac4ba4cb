//! Capability listing commands (tools, resources, prompts).

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Config, PromptDescriptor, ResourceDescriptor, ToolDescriptor};
use crate::infrastructure::mcp::ServerListing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Tools,
    Resources,
    Prompts,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CapabilityListOutput {
    Tools(ServerListing<ToolDescriptor>),
    Resources(ServerListing<ResourceDescriptor>),
    Prompts(ServerListing<PromptDescriptor>),
}

impl CapabilityListOutput {
    fn total(&self) -> usize {
        match self {
            Self::Tools(l) => l.iter().map(|(_, items)| items.len()).sum(),
            Self::Resources(l) => l.iter().map(|(_, items)| items.len()).sum(),
            Self::Prompts(l) => l.iter().map(|(_, items)| items.len()).sum(),
        }
    }

    const fn noun(&self) -> &'static str {
        match self {
            Self::Tools(_) => "tools",
            Self::Resources(_) => "resources",
            Self::Prompts(_) => "prompts",
        }
    }
}

impl CommandOutput for CapabilityListOutput {
    fn to_human(&self) -> String {
        if self.total() == 0 {
            return format!("No {} available from connected servers.", self.noun());
        }

        let formatter = TableFormatter::new();
        let table = match self {
            Self::Tools(l) => formatter.format_tools(l),
            Self::Resources(l) => formatter.format_resources(l),
            Self::Prompts(l) => formatter.format_prompts(l),
        };
        format!("{}\n\n{} {} total", table, self.total(), self.noun())
    }

    /// Keyed by server name, each value the list of descriptors.
    fn to_json(&self) -> serde_json::Value {
        fn by_server<T: Serialize>(listing: &ServerListing<T>) -> serde_json::Value {
            let map: serde_json::Map<String, serde_json::Value> = listing
                .iter()
                .map(|(server, items)| {
                    (server.clone(), serde_json::to_value(items).unwrap_or_default())
                })
                .collect();
            serde_json::Value::Object(map)
        }

        match self {
            Self::Tools(l) => by_server(l),
            Self::Resources(l) => by_server(l),
            Self::Prompts(l) => by_server(l),
        }
    }
}

pub async fn execute(listing: Listing, config: &Config, json_mode: bool) -> Result<()> {
    let manager = super::connect(config).await;

    let out = match listing {
        Listing::Tools => CapabilityListOutput::Tools(manager.get_available_tools()),
        Listing::Resources => CapabilityListOutput::Resources(manager.get_available_resources()),
        Listing::Prompts => CapabilityListOutput::Prompts(manager.get_available_prompts()),
    };
    output(&out, json_mode);

    manager.disconnect_all().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: String::new(),
            input_schema: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_json_keyed_by_server() {
        let out = CapabilityListOutput::Tools(vec![
            ("personal_assistant".to_string(), vec![tool("add_task")]),
            ("knowledge_base".to_string(), vec![tool("search_notes"), tool("add_note")]),
        ]);

        assert_eq!(out.total(), 3);
        let value = out.to_json();
        assert_eq!(value["personal_assistant"][0]["name"], json!("add_task"));
        assert_eq!(value["knowledge_base"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_empty_listing_message() {
        let out = CapabilityListOutput::Prompts(vec![("kb".to_string(), vec![])]);
        assert_eq!(out.to_human(), "No prompts available from connected servers.");
    }
}
