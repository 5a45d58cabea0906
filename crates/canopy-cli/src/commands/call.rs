//! One-shot tool call from the command line.
//!
//! Prints `{"isError": false, "result": ...}` or `{"isError": true,
//! "error": "..."}` and exits 1 on the error form.

use crate::server::TrackerServer;
use serde_json::{Map, Value, json};
use std::process;

pub struct Args {
    pub tool: String,
    pub args: Option<String>,
    pub data_dir: Option<String>,
    pub config: Option<String>,
}

fn parse_arguments(raw: Option<&str>) -> Result<Option<Map<String, Value>>, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(format!("--args must be a JSON object, got {other}")),
        Err(e) => Err(format!("--args is not valid JSON: {e}")),
    }
}

pub fn run(args: Args) {
    let config = super::resolve_config(args.config.as_deref(), args.data_dir);
    let arguments = parse_arguments(args.args.as_deref()).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let server = TrackerServer::with_memory_comments(config);
    let (envelope, failed) = match server.execute(&args.tool, arguments) {
        Ok(result) => (json!({ "isError": false, "result": result }), false),
        Err(err) => (json!({ "isError": true, "error": err.to_string() }), true),
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: failed to render result: {e}");
            process::exit(1);
        }
    }
    if failed {
        process::exit(1);
    }
}
