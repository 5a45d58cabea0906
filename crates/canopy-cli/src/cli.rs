use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "canopy",
    about = "Canopy: hierarchical issue tracker served as a Jira-compatible MCP tool surface",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the tool catalog over MCP stdio
    McpServe {
        /// Data directory holding the collection files (overrides config)
        #[arg(long)]
        data_dir: Option<String>,

        /// Config file path (default: ./canopy.toml when present)
        #[arg(long)]
        config: Option<String>,

        /// MCP server name
        #[arg(long, default_value = "canopy-mcp")]
        server_name: String,

        /// MCP server version
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        server_version: String,
    },

    /// Run one tool call and print the result envelope as JSON
    Call {
        /// Tool name, e.g. `searchJiraIssuesUsingJql`
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long)]
        args: Option<String>,

        /// Data directory holding the collection files (overrides config)
        #[arg(long)]
        data_dir: Option<String>,

        /// Config file path (default: ./canopy.toml when present)
        #[arg(long)]
        config: Option<String>,
    },

    /// Create the data directory and any missing collection files
    Init {
        /// Data directory to initialize (overrides config)
        #[arg(long)]
        data_dir: Option<String>,

        /// Config file path (default: ./canopy.toml when present)
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
