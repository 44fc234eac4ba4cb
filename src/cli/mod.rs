//! Command-line interface for the connection manager.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::models::Envelope;
use crate::domain::{format_error_message, McpError};

/// Report a failed command and exit with a non-zero status.
///
/// Manager errors are rendered with the operation they came from; in JSON
/// mode the failure is printed as an error envelope on stdout.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let message = render_error(&err);

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&Envelope::err(message)).unwrap_or_default()
        );
    } else {
        eprintln!("{message}");
    }
    std::process::exit(1);
}

fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<McpError>() {
        Some(mcp) => {
            // Outermost context names the operation; bare errors have none
            let context = if err.chain().count() > 1 {
                err.to_string()
            } else {
                "mcp-hub".to_string()
            };
            format_error_message(mcp, &context)
        }
        None => format!("Error: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_manager_error_with_context() {
        let err = anyhow::Error::new(McpError::NotConnected("kb".to_string())).context("call_tool");
        assert_eq!(
            render_error(&err),
            "Error in call_tool: NotConnectedError - Server 'kb' is not connected"
        );
    }

    #[test]
    fn test_render_plain_error() {
        let err = anyhow::anyhow!("--args must be a JSON object");
        assert_eq!(render_error(&err), "Error: --args must be a JSON object");
    }
}
