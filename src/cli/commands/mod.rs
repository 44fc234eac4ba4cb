//! CLI command implementations.

pub mod capabilities;
pub mod invoke;
pub mod status;
pub mod watch;

use anyhow::Result;
use std::sync::Arc;

use crate::cli::types::Commands;
use crate::domain::models::Config;
use crate::infrastructure::mcp::ConnectionManager;

/// Run a parsed subcommand against the configured servers.
pub async fn execute(command: Commands, config: &Config, json_mode: bool) -> Result<()> {
    match command {
        Commands::Status => status::execute(config, json_mode).await,
        Commands::Tools => capabilities::execute(capabilities::Listing::Tools, config, json_mode).await,
        Commands::Resources => {
            capabilities::execute(capabilities::Listing::Resources, config, json_mode).await
        }
        Commands::Prompts => {
            capabilities::execute(capabilities::Listing::Prompts, config, json_mode).await
        }
        Commands::Call { tool, server, args } => {
            invoke::call_tool(config, &tool, server.as_deref(), &args, json_mode).await
        }
        Commands::Read { uri, server } => {
            invoke::read_resource(config, &uri, server.as_deref(), json_mode).await
        }
        Commands::Prompt { name, server, args } => {
            invoke::get_prompt(config, &name, server.as_deref(), &args, json_mode).await
        }
        Commands::Watch => watch::execute(config, json_mode).await,
    }
}

/// Build a manager and attempt every configured server.
pub(crate) async fn connect(config: &Config) -> Arc<ConnectionManager> {
    let manager = Arc::new(ConnectionManager::new(config));
    let connected = manager.initialize().await;
    tracing::debug!(
        connected,
        configured = manager.servers().len(),
        "Connection attempts finished"
    );
    manager
}
