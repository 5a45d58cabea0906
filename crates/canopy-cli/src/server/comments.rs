//! Comment log.
//!
//! Comments live for the lifetime of the server process only; nothing here
//! touches the data directory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub issue_id: String,
    pub body: String,
    pub author: Option<String>,
    pub created: DateTime<Utc>,
}

/// Storage seam for issue comments, keyed by issue id.
pub trait CommentStore: Send + Sync {
    /// Append a comment and return the stored record with its assigned id.
    fn append(&self, issue_id: &str, body: &str, author: Option<&str>) -> Comment;

    /// Comments for one issue, oldest first.
    fn comments_for(&self, issue_id: &str) -> Vec<Comment>;

    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct InMemoryCommentStore {
    inner: Mutex<CommentLog>,
}

#[derive(Debug, Default)]
struct CommentLog {
    next_id: u64,
    by_issue: HashMap<String, Vec<Comment>>,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommentStore for InMemoryCommentStore {
    fn append(&self, issue_id: &str, body: &str, author: Option<&str>) -> Comment {
        let mut log = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        log.next_id += 1;
        let comment = Comment {
            id: (10_000 + log.next_id).to_string(),
            issue_id: issue_id.to_string(),
            body: body.to_string(),
            author: author.map(str::to_string),
            created: Utc::now(),
        };
        log.by_issue
            .entry(issue_id.to_string())
            .or_default()
            .push(comment.clone());
        comment
    }

    fn comments_for(&self, issue_id: &str) -> Vec<Comment> {
        let log = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        log.by_issue.get(issue_id).cloned().unwrap_or_default()
    }

    fn clear(&self) {
        let mut log = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *log = CommentLog::default();
    }
}
