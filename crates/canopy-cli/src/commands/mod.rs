pub mod call;
pub mod init;
pub mod mcp_serve;

use crate::config::Config;
use std::process;

/// Effective configuration for a command: file (or defaults), then flags.
pub(crate) fn resolve_config(config_path: Option<&str>, data_dir: Option<String>) -> Config {
    Config::resolve(config_path)
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        })
        .with_data_dir(data_dir)
}
