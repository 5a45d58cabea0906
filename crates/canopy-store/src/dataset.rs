//! Canonical in-memory state for one data directory.
//!
//! This is the memory boundary for `canopy-store`:
//! - load all four collections, persist issues
//! - resolve issues by id or key, projects by key
//! - allocate sequential issue keys
//!
//! Record order is file order; every read-only view preserves it.

use crate::catalog::{Project, Sprint, User};
use crate::collection::{
    Collection, CollectionError, read_records_from_path, write_records_to_path,
};
use crate::issue::{Issue, split_key};
use std::path::Path;

/// Errors raised while loading, querying or persisting a dataset.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection}: {source}")]
    Collection {
        collection: Collection,
        #[source]
        source: CollectionError,
    },

    #[error("issue not found: {0}")]
    IssueNotFound(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("issue already exists: {0}")]
    DuplicateIssue(String),
}

impl StoreError {
    fn collection(collection: Collection) -> impl FnOnce(CollectionError) -> Self {
        move |source| StoreError::Collection { collection, source }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub(crate) issues: Vec<Issue>,
    projects: Vec<Project>,
    users: Vec<User>,
    sprints: Vec<Sprint>,
}

impl Dataset {
    pub fn new(
        issues: Vec<Issue>,
        projects: Vec<Project>,
        users: Vec<User>,
        sprints: Vec<Sprint>,
    ) -> Self {
        Self {
            issues,
            projects,
            users,
            sprints,
        }
    }

    /// Load every collection under `data_dir`. Missing files read as empty.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = data_dir.as_ref();
        let issues = read_records_from_path(Collection::Issues.path_in(dir))
            .map_err(StoreError::collection(Collection::Issues))?;
        let projects = read_records_from_path(Collection::Projects.path_in(dir))
            .map_err(StoreError::collection(Collection::Projects))?;
        let users = read_records_from_path(Collection::Users.path_in(dir))
            .map_err(StoreError::collection(Collection::Users))?;
        let sprints = read_records_from_path(Collection::Sprints.path_in(dir))
            .map_err(StoreError::collection(Collection::Sprints))?;
        tracing::debug!(
            data_dir = %dir.display(),
            issues = issues.len(),
            projects = projects.len(),
            users = users.len(),
            sprints = sprints.len(),
            "loaded dataset"
        );
        Ok(Self::new(issues, projects, users, sprints))
    }

    /// Persist the issue collection. Reference collections are read-only.
    pub fn save_issues(&self, data_dir: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = Collection::Issues.path_in(data_dir);
        write_records_to_path(&path, &self.issues)
            .map_err(StoreError::collection(Collection::Issues))?;
        tracing::debug!(path = %path.display(), issues = self.issues.len(), "saved issues");
        Ok(())
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn sprints(&self) -> &[Sprint] {
        &self.sprints
    }

    /// Exact match on id first, then on key.
    pub fn issue(&self, id_or_key: &str) -> Option<&Issue> {
        self.index_of(id_or_key).map(|idx| &self.issues[idx])
    }

    /// Mutable lookup. Relation fields stay behind the hierarchy engine.
    pub fn issue_mut(&mut self, id_or_key: &str) -> Option<&mut Issue> {
        self.index_of(id_or_key).map(|idx| &mut self.issues[idx])
    }

    pub fn require_issue(&self, id_or_key: &str) -> Result<&Issue, StoreError> {
        self.issue(id_or_key)
            .ok_or_else(|| StoreError::IssueNotFound(id_or_key.to_string()))
    }

    pub(crate) fn index_of(&self, id_or_key: &str) -> Option<usize> {
        self.issues
            .iter()
            .position(|issue| issue.id == id_or_key)
            .or_else(|| self.issues.iter().position(|issue| issue.key == id_or_key))
    }

    pub(crate) fn index_of_id(&self, id: &str) -> Option<usize> {
        self.issues.iter().position(|issue| issue.id == id)
    }

    /// Project by key (case-insensitive) or by id.
    pub fn project(&self, key_or_id: &str) -> Option<&Project> {
        let wanted = key_or_id.trim();
        self.projects
            .iter()
            .find(|project| project.key.eq_ignore_ascii_case(wanted))
            .or_else(|| self.projects.iter().find(|project| project.id == wanted))
    }

    pub fn require_project(&self, key_or_id: &str) -> Result<&Project, StoreError> {
        self.project(key_or_id)
            .ok_or_else(|| StoreError::ProjectNotFound(key_or_id.trim().to_string()))
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    pub fn sprint(&self, id: &str) -> Option<&Sprint> {
        self.sprints.iter().find(|sprint| sprint.id == id)
    }

    /// Next key for a project prefix: highest existing number plus one.
    pub fn next_issue_key(&self, project_key: &str) -> String {
        let highest = self
            .issues
            .iter()
            .filter_map(|issue| split_key(&issue.key))
            .filter(|(prefix, _)| *prefix == project_key)
            .map(|(_, number)| number)
            .max()
            .unwrap_or(0);
        format!("{project_key}-{}", highest + 1)
    }

    /// Append a new issue. Ids and keys must be unused.
    ///
    /// The issue must not carry relations yet; parents and links are attached
    /// afterwards through the hierarchy engine so both endpoints stay in sync.
    pub fn insert_issue(&mut self, mut issue: Issue) -> Result<(), StoreError> {
        if self
            .issues
            .iter()
            .any(|existing| existing.id == issue.id || existing.key == issue.key)
        {
            return Err(StoreError::DuplicateIssue(issue.key));
        }
        issue.parent_id = None;
        issue.child_ids.clear();
        issue.blocked_by.clear();
        issue.blocks.clear();
        issue.related_to.clear();
        self.issues.push(issue);
        Ok(())
    }
}
