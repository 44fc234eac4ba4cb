//! Table output formatting for CLI commands
//!
//! Renders connection records, circuit breaker statistics and capability
//! listings with comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::truncate;
use crate::domain::models::{
    Connection, ConnectionStatus, PromptDescriptor, ResourceDescriptor, ToolDescriptor,
};
use crate::services::circuit_breaker::CircuitStats;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format connection records as a table
    pub fn format_connections(&self, connections: &[Connection]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Server", "Transport", "Address", "Status", "Last Contact", "Error"]));

        for conn in connections {
            let address = match (&conn.host, conn.port) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                _ => "-".to_string(),
            };
            let status_cell = if self.use_colors {
                Cell::new(conn.status.as_str()).fg(status_color(conn.status))
            } else {
                Cell::new(format!("{} {}", status_icon(conn.status), conn.status))
            };
            let last_contact = conn
                .last_contact
                .map_or_else(|| "-".to_string(), |t| t.format("%H:%M:%S").to_string());

            table.add_row(vec![
                Cell::new(&conn.server_name),
                Cell::new(conn.transport.as_str()),
                Cell::new(address),
                status_cell,
                Cell::new(last_contact),
                Cell::new(truncate(conn.error_message.as_deref().unwrap_or("-"), 50)),
            ]);
        }

        table.to_string()
    }

    /// Format circuit breaker statistics as a table
    pub fn format_circuits(&self, circuits: &[CircuitStats]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Circuit", "State", "Failures", "Opened", "Last Failure"]));

        for stats in circuits {
            let state_cell = if self.use_colors {
                let color = match stats.state.as_str() {
                    "open" => Color::Red,
                    "half_open" => Color::Yellow,
                    _ => Color::Green,
                };
                Cell::new(&stats.state).fg(color)
            } else {
                Cell::new(&stats.state)
            };

            table.add_row(vec![
                Cell::new(&stats.scope),
                state_cell,
                Cell::new(stats.consecutive_failures),
                Cell::new(stats.open_count),
                Cell::new(
                    stats
                        .last_failure_at
                        .map_or_else(|| "-".to_string(), |t| t.format("%H:%M:%S").to_string()),
                ),
            ]);
        }

        table.to_string()
    }

    pub fn format_tools(&self, listing: &[(String, Vec<ToolDescriptor>)]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Server", "Tool", "Description"]));
        for (server, tools) in listing {
            for tool in tools {
                table.add_row(vec![
                    Cell::new(server),
                    Cell::new(&tool.name).fg(Color::Cyan),
                    Cell::new(truncate(&tool.description, 60)),
                ]);
            }
        }
        table.to_string()
    }

    pub fn format_resources(&self, listing: &[(String, Vec<ResourceDescriptor>)]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Server", "URI", "Type", "Description"]));
        for (server, resources) in listing {
            for resource in resources {
                table.add_row(vec![
                    Cell::new(server),
                    Cell::new(&resource.uri).fg(Color::Cyan),
                    Cell::new(resource.mime_type.as_deref().unwrap_or("-")),
                    Cell::new(truncate(&resource.description, 50)),
                ]);
            }
        }
        table.to_string()
    }

    pub fn format_prompts(&self, listing: &[(String, Vec<PromptDescriptor>)]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Server", "Prompt", "Arguments", "Description"]));
        for (server, prompts) in listing {
            for prompt in prompts {
                let arguments = if prompt.arguments.is_empty() {
                    "-".to_string()
                } else {
                    prompt
                        .arguments
                        .iter()
                        .map(|a| if a.required { format!("{}*", a.name) } else { a.name.clone() })
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                table.add_row(vec![
                    Cell::new(server),
                    Cell::new(&prompt.name).fg(Color::Cyan),
                    Cell::new(arguments),
                    Cell::new(truncate(&prompt.description, 50)),
                ]);
            }
        }
        table.to_string()
    }

    /// Create a base table with common settings
    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }
        if !self.use_colors {
            table.force_no_tty();
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

const fn status_color(status: ConnectionStatus) -> Color {
    match status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Connecting => Color::Cyan,
        ConnectionStatus::Error => Color::Red,
        ConnectionStatus::Disconnected => Color::DarkGrey,
    }
}

const fn status_icon(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connected => "●",
        ConnectionStatus::Connecting => "⟳",
        ConnectionStatus::Error => "✗",
        ConnectionStatus::Disconnected => "○",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ServerDescriptor;

    #[test]
    fn test_format_connections_plain() {
        let mut conn = Connection::connecting(&ServerDescriptor::http("kb", "127.0.0.1", 8002));
        conn.degrade("Transport error for server 'kb': request timed out");

        let output = TableFormatter::with_config(false, Some(140)).format_connections(&[conn]);

        assert!(output.contains("kb"));
        assert!(output.contains("127.0.0.1:8002"));
        assert!(output.contains("✗ error"));
        assert!(output.contains("request timed out"));
    }

    #[test]
    fn test_format_tools() {
        let listing = vec![(
            "personal_assistant".to_string(),
            vec![ToolDescriptor {
                name: "add_task".to_string(),
                description: "Add a new task".to_string(),
                input_schema: serde_json::Value::Null,
            }],
        )];

        let output = TableFormatter::with_config(false, Some(140)).format_tools(&listing);
        assert!(output.contains("personal_assistant"));
        assert!(output.contains("add_task"));
    }
}
