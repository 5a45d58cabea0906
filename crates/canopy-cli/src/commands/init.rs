use canopy_store::{CollectionFileStatus, ensure_collection_files};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub data_dir: PathBuf,
    pub created_data_dir: bool,
    pub collections: Vec<CollectionFileStatus>,
}

pub fn init_data_dir(path: impl AsRef<Path>) -> Result<InitOutcome, String> {
    let data_dir = path.as_ref().to_path_buf();
    if data_dir.exists() && !data_dir.is_dir() {
        return Err(format!(
            "data dir exists but is not a directory: {}",
            data_dir.display()
        ));
    }
    let created_data_dir = !data_dir.exists();
    let collections = ensure_collection_files(&data_dir)
        .map_err(|e| format!("failed to initialize {}: {e}", data_dir.display()))?;

    Ok(InitOutcome {
        data_dir,
        created_data_dir,
        collections,
    })
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub fn run(data_dir: Option<String>, config: Option<String>, json_output: bool) {
    let config = super::resolve_config(config.as_deref(), data_dir);
    let outcome = init_data_dir(&config.data_dir).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        let collections: Vec<_> = outcome
            .collections
            .iter()
            .map(|status| {
                json!({
                    "collection": status.collection.as_str(),
                    "path": status.path.display().to_string(),
                    "created": status.created
                })
            })
            .collect();
        let payload = json!({
            "action": "init",
            "dataDir": outcome.data_dir.display().to_string(),
            "createdDataDir": outcome.created_data_dir,
            "collections": collections
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("error: failed to render init summary: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("canopy init");
    println!();
    println!("  data dir: {}", outcome.data_dir.display());
    println!("  created data dir: {}", yes_no(outcome.created_data_dir));
    for status in &outcome.collections {
        println!(
            "  {}: {} (created: {})",
            status.collection,
            status.path.display(),
            yes_no(status.created)
        );
    }
}
