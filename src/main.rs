//! mcp-hub CLI entry point.

use clap::Parser;

use mcp_hub::cli::Cli;
use mcp_hub::infrastructure::config::ConfigLoader;
use mcp_hub::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => mcp_hub::cli::handle_error(err, cli.json),
    };

    // Keep the guard alive so buffered file logs are flushed on exit
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let result = mcp_hub::cli::commands::execute(cli.command, &config, cli.json).await;

    if let Err(err) = result {
        mcp_hub::cli::handle_error(err, cli.json);
    }
}
