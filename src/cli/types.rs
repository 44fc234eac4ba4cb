//! CLI type definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mcp-hub")]
#[command(about = "Connect to MCP servers, inspect their capabilities and call them", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to .mcp-hub/config.yaml layered with env)
    #[arg(short, long, global = true, env = "MCP_HUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to every server and show connection and circuit status
    Status,

    /// List tools offered by connected servers
    Tools,

    /// List resources offered by connected servers
    Resources,

    /// List prompts offered by connected servers
    Prompts,

    /// Call a tool
    Call {
        /// Tool name
        tool: String,
        /// Server to call (defaults to the first server offering the tool)
        #[arg(short, long)]
        server: Option<String>,
        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Read a resource
    Read {
        /// Resource URI
        uri: String,
        /// Server to read from (defaults to the first server offering the URI)
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Render a prompt
    Prompt {
        /// Prompt name
        name: String,
        /// Server to ask (defaults to the first server offering the prompt)
        #[arg(short, long)]
        server: Option<String>,
        /// Prompt argument (format: key=value), repeatable
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },

    /// Keep connections monitored until Ctrl-C
    Watch,
}
