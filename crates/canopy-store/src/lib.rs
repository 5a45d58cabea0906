//! # canopy-store
//!
//! Record layer for the issue tracker.
//!
//! This crate provides:
//! - `Issue`, `Project`, `User` and `Sprint` record types
//! - flat-file collections (one JSON array per record kind)
//! - `Dataset` (the in-memory state of one data directory)
//! - the hierarchy and link engine, the only writer of relation fields
//! - lock-scoped atomic mutation over a data directory
//!
//! ## Data model
//!
//! ```text
//! <data dir>/{issues,projects,users,sprints}.json
//!     ↕  load / save_issues
//! Dataset (file-ordered in-memory records)
//! ```

pub mod atomic_store;
pub mod catalog;
pub mod collection;
pub mod dataset;
pub mod hierarchy;
pub mod issue;

pub use atomic_store::{AtomicStoreMutationError, dataset_lock_path, mutate_dataset};
pub use catalog::{Project, Sprint, SprintStatus, User};
pub use collection::{
    Collection, CollectionError, CollectionFileStatus, ensure_collection_files,
    read_records_from_path, write_records_to_path,
};
pub use dataset::{Dataset, StoreError};
pub use hierarchy::{HierarchyError, LinkAction, LinkOutcome, LinkType, MoveOutcome};
pub use issue::{Issue, IssuePriority, IssueStatus, IssueType, split_key};
