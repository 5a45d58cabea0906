//! Tool-call server: catalog, dispatch, handlers and response shaping.
//!
//! The server is transport-agnostic. `mcp-serve` feeds it MCP `tools/call`
//! requests and `canopy call` feeds it one call from the command line; both
//! go through [`TrackerServer::execute`].

pub mod comments;
pub mod dispatch;
pub mod format;
pub mod handlers;
pub mod tools;

use crate::config::Config;
use canopy_store::{AtomicStoreMutationError, Dataset, HierarchyError, StoreError, mutate_dataset};
use comments::{CommentStore, InMemoryCommentStore};
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("invalid issue type `{0}` (expected one of: Initiative, Epic, Feature, Story, Task, Bug, Subtask)")]
    InvalidType(String),

    #[error("invalid transition `{0}` (expected a transition name, transition id or status)")]
    InvalidTransition(String),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    StoreLock(String),
}

impl ToolError {
    pub(crate) fn invalid_arguments(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn issue_not_found(id_or_key: &str) -> Self {
        Self::NotFound(format!("issue not found: {id_or_key}"))
    }
}

fn map_atomic_store_mutation_error(err: AtomicStoreMutationError<ToolError>) -> ToolError {
    match err {
        AtomicStoreMutationError::Mutation(inner) => inner,
        AtomicStoreMutationError::Store(source) => ToolError::Store(source),
        busy @ AtomicStoreMutationError::LockBusy { .. } => ToolError::StoreLock(busy.to_string()),
        io @ AtomicStoreMutationError::LockIo { .. } => ToolError::StoreLock(io.to_string()),
    }
}

/// Shared state behind every tool call.
pub struct TrackerServer {
    config: Config,
    comments: Arc<dyn CommentStore>,
    dispatch_lock: Mutex<()>,
}

impl TrackerServer {
    pub fn new(config: Config, comments: Arc<dyn CommentStore>) -> Self {
        Self {
            config,
            comments,
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Server with a fresh process-lifetime comment log.
    pub fn with_memory_comments(config: Config) -> Self {
        Self::new(config, Arc::new(InMemoryCommentStore::new()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn comments(&self) -> &dyn CommentStore {
        self.comments.as_ref()
    }

    /// Read-only snapshot of the data directory.
    pub(crate) fn load(&self) -> Result<Dataset, ToolError> {
        Ok(Dataset::load(&self.config.data_dir)?)
    }

    /// Lock-scoped read-mutate-write; see [`mutate_dataset`].
    pub(crate) fn mutate<T, F>(&self, mutator: F) -> Result<T, ToolError>
    where
        F: FnOnce(&mut Dataset) -> Result<(T, bool), ToolError>,
    {
        mutate_dataset(&self.config.data_dir, mutator).map_err(map_atomic_store_mutation_error)
    }
}
