//! Canopy CLI: the `canopy` command.

mod cli;
mod commands;
mod config;
mod server;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    // Tracing is opt-in via RUST_LOG and always goes to stderr:
    // stdout carries the MCP stdio stream and `call` output.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::McpServe {
            data_dir,
            config,
            server_name,
            server_version,
        } => commands::mcp_serve::run(commands::mcp_serve::Args {
            data_dir,
            config,
            server_name,
            server_version,
        }),

        Commands::Call {
            tool,
            args,
            data_dir,
            config,
        } => commands::call::run(commands::call::Args {
            tool,
            args,
            data_dir,
            config,
        }),

        Commands::Init {
            data_dir,
            config,
            json,
        } => commands::init::run(data_dir, config, json),
    }
}
