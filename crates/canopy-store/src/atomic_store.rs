//! Lock-scoped read-mutate-write over a data directory.
//!
//! Every mutating tool call runs as one `mutate_dataset` invocation: take the
//! lock, load the full dataset, let the mutator work in memory, persist the
//! issue collection once if it reported a change, release the lock.
//!
//! The lock is `issues.json.lock`, created with create-new semantics and
//! holding `pid=` and `utc=` lines. A held lock is never waited on. A lock
//! older than [`STALE_LOCK_AFTER_SECS`] was left by a process that died
//! mid-mutation and is replaced once.

use crate::collection::Collection;
use crate::dataset::{Dataset, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Mutations finish in milliseconds; a lock this old has no live owner.
pub const STALE_LOCK_AFTER_SECS: i64 = 600;

pub fn dataset_lock_path(data_dir: &Path) -> PathBuf {
    let mut path: OsString = Collection::Issues.path_in(data_dir).into_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

#[derive(Debug, thiserror::Error)]
pub enum AtomicStoreMutationError<E> {
    #[error("issue store lock busy: {lock_path} (held by {holder})")]
    LockBusy { lock_path: String, holder: String },

    #[error("failed to acquire issue store lock {lock_path}: {message}")]
    LockIo { lock_path: String, message: String },

    #[error(transparent)]
    Store(StoreError),

    #[error("{0}")]
    Mutation(E),
}

/// Execute one lock-scoped mutation against the dataset in `data_dir`.
///
/// The mutator returns `(value, changed)`:
/// - `value` is handed back to the caller
/// - `changed=true` persists the issue collection before the lock is released
///
/// A mutator error aborts before anything is written.
pub fn mutate_dataset<T, E, F>(
    data_dir: impl AsRef<Path>,
    mutator: F,
) -> Result<T, AtomicStoreMutationError<E>>
where
    F: FnOnce(&mut Dataset) -> Result<(T, bool), E>,
{
    let data_dir = data_dir.as_ref();
    let _lock = DatasetLock::acquire(data_dir)?;

    let mut dataset = Dataset::load(data_dir).map_err(AtomicStoreMutationError::Store)?;
    let (value, changed) = mutator(&mut dataset).map_err(AtomicStoreMutationError::Mutation)?;
    if changed {
        dataset
            .save_issues(data_dir)
            .map_err(AtomicStoreMutationError::Store)?;
    }
    Ok(value)
}

/// Who holds a lock file, as far as its contents and age tell.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LockHolder {
    pid: Option<u32>,
    acquired_at: Option<DateTime<Utc>>,
}

impl LockHolder {
    fn current() -> Self {
        Self {
            pid: Some(std::process::id()),
            acquired_at: Some(Utc::now()),
        }
    }

    fn render(&self) -> String {
        let mut text = String::new();
        if let Some(pid) = self.pid {
            text.push_str(&format!("pid={pid}\n"));
        }
        if let Some(acquired_at) = self.acquired_at {
            text.push_str(&format!("utc={}\n", acquired_at.to_rfc3339()));
        }
        text
    }

    fn parse(text: &str) -> Self {
        let mut holder = Self {
            pid: None,
            acquired_at: None,
        };
        for line in text.lines() {
            match line.split_once('=') {
                Some(("pid", pid)) => holder.pid = pid.trim().parse().ok(),
                Some(("utc", utc)) => {
                    holder.acquired_at = DateTime::parse_from_rfc3339(utc.trim())
                        .ok()
                        .map(|at| at.with_timezone(&Utc));
                }
                _ => {}
            }
        }
        holder
    }

    /// Lock file contents, falling back to the file's mtime for the age.
    fn read(lock_path: &Path) -> Self {
        let mut holder = Self::parse(&fs::read_to_string(lock_path).unwrap_or_default());
        if holder.acquired_at.is_none() {
            holder.acquired_at = fs::metadata(lock_path)
                .and_then(|meta| meta.modified())
                .ok()
                .map(DateTime::<Utc>::from);
        }
        holder
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.acquired_at.is_some_and(|acquired_at| {
            now.signed_duration_since(acquired_at) > Duration::seconds(STALE_LOCK_AFTER_SECS)
        })
    }

    fn describe(&self) -> String {
        let who = self
            .pid
            .map_or_else(|| "unknown process".to_string(), |pid| format!("pid {pid}"));
        match self.acquired_at {
            Some(acquired_at) => format!("{who} since {}", acquired_at.to_rfc3339()),
            None => who,
        }
    }
}

/// Held for the duration of one mutation; the lock file goes away on drop.
struct DatasetLock {
    lock_path: PathBuf,
    _file: File,
}

impl DatasetLock {
    fn acquire<E>(data_dir: &Path) -> Result<Self, AtomicStoreMutationError<E>> {
        let lock_path = dataset_lock_path(data_dir);
        fs::create_dir_all(data_dir).map_err(|e| lock_io(&lock_path, e.to_string()))?;
        Self::open(lock_path, true)
    }

    fn open<E>(lock_path: PathBuf, may_reclaim: bool) -> Result<Self, AtomicStoreMutationError<E>> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                if let Err(err) = file.write_all(LockHolder::current().render().as_bytes()) {
                    let _ = fs::remove_file(&lock_path);
                    return Err(lock_io(&lock_path, err.to_string()));
                }
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let holder = LockHolder::read(&lock_path);
                if may_reclaim && holder.is_stale(Utc::now()) {
                    tracing::warn!(
                        lock_path = %lock_path.display(),
                        holder = %holder.describe(),
                        "reclaiming stale issue store lock"
                    );
                    match fs::remove_file(&lock_path) {
                        Ok(()) => {}
                        Err(err) if err.kind() == ErrorKind::NotFound => {}
                        Err(err) => return Err(lock_io(&lock_path, err.to_string())),
                    }
                    return Self::open(lock_path, false);
                }
                tracing::warn!(
                    lock_path = %lock_path.display(),
                    holder = %holder.describe(),
                    "issue store lock busy"
                );
                Err(AtomicStoreMutationError::LockBusy {
                    lock_path: lock_path.display().to_string(),
                    holder: holder.describe(),
                })
            }
            Err(err) => Err(lock_io(&lock_path, err.to_string())),
        }
    }
}

impl Drop for DatasetLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_io<E>(lock_path: &Path, message: String) -> AtomicStoreMutationError<E> {
    AtomicStoreMutationError::LockIo {
        lock_path: lock_path.display().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{Issue, IssueType};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "canopy-atomic-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should exist");
        path
    }

    #[derive(Debug, thiserror::Error)]
    #[error("rejected")]
    struct Rejected;

    #[test]
    fn changed_mutation_persists_and_releases_lock() {
        let dir = temp_dir("persist");
        let key = mutate_dataset(&dir, |dataset| -> Result<(String, bool), Rejected> {
            let key = dataset.next_issue_key("PHX");
            dataset
                .insert_issue(Issue::new("i-1", key.clone(), IssueType::Task, "t", "u-1"))
                .map_err(|_| Rejected)?;
            Ok((key, true))
        })
        .expect("mutation should succeed");

        assert_eq!(key, "PHX-1");
        assert!(!dataset_lock_path(&dir).exists());
        let dataset = Dataset::load(&dir).expect("dataset should reload");
        assert_eq!(dataset.issues().len(), 1);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn failed_mutation_writes_nothing() {
        let dir = temp_dir("abort");
        let err = mutate_dataset(&dir, |dataset| -> Result<((), bool), Rejected> {
            dataset
                .insert_issue(Issue::new("i-1", "PHX-1", IssueType::Task, "t", "u-1"))
                .map_err(|_| Rejected)?;
            Err(Rejected)
        })
        .expect_err("mutation should fail");

        assert!(matches!(err, AtomicStoreMutationError::Mutation(Rejected)));
        assert!(!Collection::Issues.path_in(&dir).exists());
        assert!(!dataset_lock_path(&dir).exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn held_lock_reports_busy_with_holder() {
        let dir = temp_dir("busy");
        fs::write(dataset_lock_path(&dir), "pid=0\n").expect("lock fixture should write");

        let err = mutate_dataset(&dir, |_| -> Result<((), bool), Rejected> { Ok(((), false)) })
            .expect_err("busy lock must error");
        assert!(matches!(&err, AtomicStoreMutationError::LockBusy { holder, .. } if holder.starts_with("pid 0 since ")));
        assert!(err.to_string().contains("lock busy"));
        assert!(dataset_lock_path(&dir).exists(), "a live lock is left alone");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn stale_lock_is_reclaimed_and_released() {
        let dir = temp_dir("stale");
        let abandoned = LockHolder {
            pid: Some(4242),
            acquired_at: Some(Utc::now() - Duration::seconds(STALE_LOCK_AFTER_SECS + 60)),
        };
        fs::write(dataset_lock_path(&dir), abandoned.render()).expect("lock fixture should write");

        let count = mutate_dataset(&dir, |dataset| -> Result<(usize, bool), Rejected> {
            dataset
                .insert_issue(Issue::new("i-1", "PHX-1", IssueType::Task, "t", "u-1"))
                .map_err(|_| Rejected)?;
            Ok((dataset.issues().len(), true))
        })
        .expect("stale lock should be reclaimed");

        assert_eq!(count, 1);
        assert!(!dataset_lock_path(&dir).exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn lock_holder_round_trips_and_ages() {
        let holder = LockHolder::current();
        let parsed = LockHolder::parse(&holder.render());
        assert_eq!(parsed.pid, Some(std::process::id()));
        assert!(!parsed.is_stale(Utc::now()));
        assert!(parsed.is_stale(Utc::now() + Duration::seconds(STALE_LOCK_AFTER_SECS + 1)));

        let unknown = LockHolder::parse("garbage");
        assert_eq!(unknown.pid, None);
        assert!(!unknown.is_stale(Utc::now()));
        assert_eq!(unknown.describe(), "unknown process");
    }
}
