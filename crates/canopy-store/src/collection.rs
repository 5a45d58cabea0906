//! Flat-file collections: one JSON array per record kind.
//!
//! Each collection lives in its own file under the data directory
//! (`issues.json`, `projects.json`, `users.json`, `sprints.json`). Writes go
//! through a temp file, fsync and rename so a crash never leaves a half-written
//! array behind.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// The four persisted record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Issues,
    Projects,
    Users,
    Sprints,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Issues,
        Collection::Projects,
        Collection::Users,
        Collection::Sprints,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Issues => "issues",
            Collection::Projects => "projects",
            Collection::Users => "users",
            Collection::Sprints => "sprints",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Issues => "issues.json",
            Collection::Projects => "projects.json",
            Collection::Users => "users.json",
            Collection::Sprints => "sprints.json",
        }
    }

    pub fn path_in(self, data_dir: impl AsRef<Path>) -> PathBuf {
        data_dir.as_ref().join(self.file_name())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read records from a JSON array. Blank input reads as an empty collection.
pub fn read_records<T: DeserializeOwned>(mut reader: impl Read) -> Result<Vec<T>, CollectionError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| CollectionError::Io(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text).map_err(|e| CollectionError::Parse {
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })
}

/// Write records as a pretty-printed JSON array with a trailing newline.
pub fn write_records<T: Serialize>(
    writer: &mut impl Write,
    records: &[T],
) -> Result<(), CollectionError> {
    serde_json::to_writer_pretty(&mut *writer, records)
        .map_err(|e| CollectionError::Serialize(e.to_string()))?;
    writeln!(writer).map_err(|e| CollectionError::Io(e.to_string()))?;
    Ok(())
}

/// Read a collection file. A missing file reads as an empty collection.
pub fn read_records_from_path<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Vec<T>, CollectionError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path).map_err(|e| CollectionError::Io(format!("{}: {e}", path.display())))?;
    validate_substrate_bytes(path, &bytes)?;
    read_records(bytes.as_slice())
}

/// Atomically replace a collection file.
pub fn write_records_to_path<T: Serialize>(
    path: impl AsRef<Path>,
    records: &[T],
) -> Result<(), CollectionError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| CollectionError::Io(format!("{}: {e}", parent.display())))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), CollectionError> {
        let file = File::create(&tmp_path)
            .map_err(|e| CollectionError::Io(format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        write_records(&mut writer, records)?;
        writer
            .flush()
            .map_err(|e| CollectionError::Io(format!("{}: {e}", tmp_path.display())))?;
        let file = writer
            .into_inner()
            .map_err(|e| CollectionError::Io(format!("{}: {e}", tmp_path.display())))?;
        file.sync_all()
            .map_err(|e| CollectionError::Io(format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CollectionError::Io(format!(
            "{} -> {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent)
            .map_err(|e| CollectionError::Io(format!("{}: {e}", parent.display())))?;
        dir.sync_all()
            .map_err(|e| CollectionError::Io(format!("{}: {e}", parent.display())))?;
    }

    Ok(())
}

/// Outcome of [`ensure_collection_files`] for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFileStatus {
    pub collection: Collection,
    pub path: PathBuf,
    pub created: bool,
}

/// Create the data directory and any missing collection file as `[]`.
///
/// Existing files are left untouched, so running this twice is harmless.
pub fn ensure_collection_files(
    data_dir: impl AsRef<Path>,
) -> Result<Vec<CollectionFileStatus>, CollectionError> {
    let data_dir = data_dir.as_ref();
    fs::create_dir_all(data_dir)
        .map_err(|e| CollectionError::Io(format!("{}: {e}", data_dir.display())))?;

    let mut statuses = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        let path = collection.path_in(data_dir);
        let created = !path.exists();
        if created {
            write_records_to_path::<serde_json::Value>(&path, &[])?;
            tracing::info!(collection = %collection, path = %path.display(), "created collection file");
        }
        statuses.push(CollectionFileStatus {
            collection,
            path,
            created,
        });
    }
    Ok(statuses)
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_substrate_bytes(path: &Path, bytes: &[u8]) -> Result<(), CollectionError> {
    if bytes.contains(&0) {
        return Err(CollectionError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(CollectionError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

/// Errors from collection file operations.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("line {line}, column {column}: parse error: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted collection: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::User;
    use serde_json::Value;

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "canopy-collection-{prefix}-{}-{unique}.json",
            std::process::id()
        ))
    }

    #[test]
    fn missing_and_blank_files_read_as_empty() {
        let path = temp_path("missing");
        let records: Vec<Value> = read_records_from_path(&path).expect("missing file is empty");
        assert!(records.is_empty());

        fs::write(&path, "  \n").expect("fixture should write");
        let records: Vec<Value> = read_records_from_path(&path).expect("blank file is empty");
        assert!(records.is_empty());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn read_records_from_path_rejects_nul_payload() {
        let path = temp_path("nul");
        fs::write(&path, b"[{\"id\":\"u-1\"}]\0garbage").expect("fixture should write");

        let result: Result<Vec<Value>, _> = read_records_from_path(&path);
        match result {
            Err(CollectionError::Corrupt(message)) => {
                assert!(message.contains("contains NUL"));
            }
            other => panic!("expected corrupt collection error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn parse_errors_carry_position() {
        let path = temp_path("parse");
        fs::write(&path, "[\n  {\"id\": }\n]").expect("fixture should write");

        let result: Result<Vec<Value>, _> = read_records_from_path(&path);
        match result {
            Err(CollectionError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn write_records_to_path_replaces_file_atomically() {
        let path = temp_path("atomic-write");
        let first: User = serde_json::from_value(serde_json::json!({
            "id": "u-1", "displayName": "First", "email": "first@example.com"
        }))
        .expect("user should decode");
        write_records_to_path(&path, &[first]).expect("first write should succeed");

        let second: User = serde_json::from_value(serde_json::json!({
            "id": "u-2", "displayName": "Second", "email": "second@example.com"
        }))
        .expect("user should decode");
        write_records_to_path(&path, &[second]).expect("second write should succeed");

        let text = fs::read_to_string(&path).expect("collection should exist");
        assert!(!text.contains("u-1"));
        assert!(text.contains("u-2"));
        let users: Vec<User> = read_records_from_path(&path).expect("collection should read");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name, "Second");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn ensure_collection_files_is_idempotent() {
        let dir = temp_path("init-dir");
        let first = ensure_collection_files(&dir).expect("init should succeed");
        assert!(first.iter().all(|status| status.created));

        fs::write(Collection::Users.path_in(&dir), r#"[{"id":"u-1","displayName":"A"}]"#)
            .expect("fixture should write");
        let second = ensure_collection_files(&dir).expect("re-init should succeed");
        assert!(second.iter().all(|status| !status.created));

        let users: Vec<User> =
            read_records_from_path(Collection::Users.path_in(&dir)).expect("users should read");
        assert_eq!(users.len(), 1);

        let _ = fs::remove_dir_all(dir);
    }
}
