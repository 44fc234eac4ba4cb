//! Status command: connection records and circuit statistics.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Config, Connection, ConnectionStatus};
use crate::services::circuit_breaker::CircuitStats;

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub connections: Vec<Connection>,
    pub circuits: Vec<CircuitStats>,
}

impl StatusOutput {
    fn connected_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|c| c.status == ConnectionStatus::Connected)
            .count()
    }
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        if self.connections.is_empty() {
            return "No servers configured.".to_string();
        }

        let formatter = TableFormatter::new();
        let mut lines = vec![
            format!(
                "{}/{} servers connected",
                self.connected_count(),
                self.connections.len()
            ),
            formatter.format_connections(&self.connections),
        ];

        if !self.circuits.is_empty() {
            lines.push(String::new());
            lines.push("Circuit breakers:".to_string());
            lines.push(formatter.format_circuits(&self.circuits));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let manager = super::connect(config).await;

    let out = StatusOutput {
        connections: manager.get_all_connections(),
        circuits: manager.circuit_stats(),
    };
    output(&out, json_mode);

    manager.disconnect_all().await;
    Ok(())
}
