//! Issue type: the central record of the tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Issue classification. Serialized as the display name (`"Subtask"`, `"Bug"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    #[serde(alias = "initiative")]
    Initiative,
    #[serde(alias = "epic")]
    Epic,
    #[serde(alias = "feature")]
    Feature,
    #[serde(alias = "story")]
    Story,
    #[serde(alias = "task")]
    Task,
    #[serde(alias = "bug")]
    Bug,
    #[serde(alias = "subtask", alias = "Sub-task", alias = "sub-task")]
    Subtask,
}

impl IssueType {
    pub const ALL: [IssueType; 7] = [
        IssueType::Initiative,
        IssueType::Epic,
        IssueType::Feature,
        IssueType::Story,
        IssueType::Task,
        IssueType::Bug,
        IssueType::Subtask,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Initiative => "Initiative",
            IssueType::Epic => "Epic",
            IssueType::Feature => "Feature",
            IssueType::Story => "Story",
            IssueType::Task => "Task",
            IssueType::Bug => "Bug",
            IssueType::Subtask => "Subtask",
        }
    }

    /// Case- and separator-insensitive lookup (`"sub-task"`, `"STORY"`).
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = compact(raw);
        Self::ALL
            .into_iter()
            .find(|candidate| compact(candidate.as_str()) == wanted)
    }

    pub fn is_subtask(self) -> bool {
        matches!(self, IssueType::Subtask)
    }

    /// Position in the planning hierarchy; higher levels usually parent lower ones.
    pub fn hierarchy_level(self) -> i32 {
        match self {
            IssueType::Initiative => 3,
            IssueType::Epic => 2,
            IssueType::Feature => 1,
            IssueType::Story | IssueType::Task | IssueType::Bug => 0,
            IssueType::Subtask => -1,
        }
    }
}

/// Workflow status. Serialized as the board column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IssueStatus {
    #[default]
    #[serde(rename = "To Do", alias = "todo", alias = "Todo", alias = "to do", alias = "TODO")]
    Todo,
    #[serde(
        rename = "In Progress",
        alias = "in progress",
        alias = "in_progress",
        alias = "InProgress",
        alias = "inprogress"
    )]
    InProgress,
    #[serde(
        rename = "In Review",
        alias = "in review",
        alias = "in_review",
        alias = "InReview",
        alias = "inreview"
    )]
    InReview,
    #[serde(rename = "Done", alias = "done", alias = "DONE")]
    Done,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Todo => "To Do",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::InReview => "In Review",
            IssueStatus::Done => "Done",
        }
    }

    /// Status alias table: `"todo"`, `"to do"`, `"TO_DO"` all resolve to `To Do`.
    pub fn parse(raw: &str) -> Option<Self> {
        match compact(raw).as_str() {
            "todo" | "open" | "backlog" => Some(IssueStatus::Todo),
            "inprogress" | "started" | "doing" => Some(IssueStatus::InProgress),
            "inreview" | "review" | "codereview" => Some(IssueStatus::InReview),
            "done" | "closed" | "resolved" | "complete" | "completed" => Some(IssueStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IssuePriority {
    #[serde(alias = "highest")]
    Highest,
    #[serde(alias = "high")]
    High,
    #[default]
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "lowest")]
    Lowest,
}

impl IssuePriority {
    pub const ALL: [IssuePriority; 5] = [
        IssuePriority::Highest,
        IssuePriority::High,
        IssuePriority::Medium,
        IssuePriority::Low,
        IssuePriority::Lowest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssuePriority::Highest => "Highest",
            IssuePriority::High => "High",
            IssuePriority::Medium => "Medium",
            IssuePriority::Low => "Low",
            IssuePriority::Lowest => "Lowest",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = compact(raw);
        Self::ALL
            .into_iter()
            .find(|candidate| compact(candidate.as_str()) == wanted)
    }
}

/// An issue: one trackable unit of work.
///
/// Relation fields (`parentId`, `childIds`, `blocks`, `blockedBy`,
/// `relatedTo`) are readable through accessors only. They are written by the
/// hierarchy engine in [`crate::hierarchy`], which updates both endpoints of
/// every relation together.
///
/// Keys this type does not model (estimates, custom fields) are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    // ── Identity ──
    pub id: String,
    pub key: String,

    // ── Classification ──
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub priority: IssuePriority,

    // ── Content ──
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,

    // ── People ──
    #[serde(default)]
    pub assignee: Option<String>,
    pub reporter: String,

    // ── Hierarchy & graph ──
    #[serde(default)]
    pub(crate) parent_id: Option<String>,
    #[serde(default)]
    pub(crate) child_ids: Vec<String>,
    #[serde(default)]
    pub(crate) blocked_by: Vec<String>,
    #[serde(default)]
    pub(crate) blocks: Vec<String>,
    #[serde(default)]
    pub(crate) related_to: Vec<String>,

    // ── Planning ──
    #[serde(default)]
    pub sprint: Option<String>,
    #[serde(default)]
    pub story_points: Option<Number>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,

    // ── Timestamps ──
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// Fresh issue with defaults: `To Do`, `Medium`, no relations.
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        issue_type: IssueType,
        title: impl Into<String>,
        reporter: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            key: key.into(),
            issue_type,
            status: IssueStatus::default(),
            priority: IssuePriority::default(),
            title: title.into(),
            description: None,
            labels: Vec::new(),
            assignee: None,
            reporter: reporter.into(),
            parent_id: None,
            child_ids: Vec::new(),
            blocked_by: Vec::new(),
            blocks: Vec::new(),
            related_to: Vec::new(),
            sprint: None,
            story_points: None,
            due_date: None,
            start_date: None,
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn child_ids(&self) -> &[String] {
        &self.child_ids
    }

    pub fn blocked_by(&self) -> &[String] {
        &self.blocked_by
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    pub fn related_to(&self) -> &[String] {
        &self.related_to
    }

    /// Project prefix of the key (`"PHX"` for `"PHX-12"`).
    pub fn project_key(&self) -> &str {
        split_key(&self.key).map_or(self.key.as_str(), |(prefix, _)| prefix)
    }

    pub fn touch_updated_at(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: IssueStatus) {
        self.status = status;
        self.touch_updated_at();
    }

    /// Replace labels, keeping first-seen order and dropping duplicates.
    pub fn set_labels(&mut self, labels: Vec<String>) {
        let mut deduped: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.trim().to_string();
            if !label.is_empty() && !deduped.contains(&label) {
                deduped.push(label);
            }
        }
        self.labels = deduped;
    }
}

/// Split `"<prefix>-<integer>"`; `None` when the suffix is not an integer.
pub fn split_key(key: &str) -> Option<(&str, u64)> {
    let (prefix, number) = key.rsplit_once('-')?;
    if prefix.is_empty() {
        return None;
    }
    number.parse().ok().map(|n| (prefix, n))
}

fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '-' && *ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_decodes_camel_case_record_and_keeps_unknown_keys() {
        let raw = r#"{
            "id": "i-1",
            "key": "PHX-3",
            "type": "Story",
            "status": "In Progress",
            "priority": "High",
            "title": "Checkout flow",
            "description": null,
            "labels": ["web"],
            "assignee": null,
            "reporter": "u-1",
            "parentId": "i-0",
            "childIds": [],
            "blockedBy": [],
            "blocks": ["i-2"],
            "relatedTo": [],
            "sprint": null,
            "storyPoints": 5,
            "dueDate": "2024-03-01",
            "startDate": null,
            "originalEstimate": "3d",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-02T00:00:00.000Z"
        }"#;

        let issue: Issue = serde_json::from_str(raw).expect("issue should decode");
        assert_eq!(issue.issue_type, IssueType::Story);
        assert_eq!(issue.status, IssueStatus::InProgress);
        assert_eq!(issue.parent_id(), Some("i-0"));
        assert_eq!(issue.blocks(), ["i-2".to_string()]);
        assert_eq!(issue.project_key(), "PHX");
        assert_eq!(issue.extra["originalEstimate"], "3d");

        let encoded = serde_json::to_value(&issue).expect("issue should encode");
        assert_eq!(encoded["storyPoints"], 5);
        assert_eq!(encoded["originalEstimate"], "3d");
        assert_eq!(encoded["type"], "Story");
        assert_eq!(encoded["status"], "In Progress");
    }

    #[test]
    fn status_aliases_resolve_to_canonical_names() {
        for raw in ["todo", "to do", "To Do", "TO_DO", "open"] {
            assert_eq!(IssueStatus::parse(raw), Some(IssueStatus::Todo), "{raw}");
        }
        assert_eq!(
            IssueStatus::parse("in_progress"),
            Some(IssueStatus::InProgress)
        );
        assert_eq!(IssueStatus::parse("In Review"), Some(IssueStatus::InReview));
        assert_eq!(IssueStatus::parse("archived"), None);
    }

    #[test]
    fn issue_type_parse_is_lenient_and_only_subtask_is_subtask() {
        assert_eq!(IssueType::parse("sub-task"), Some(IssueType::Subtask));
        assert_eq!(IssueType::parse("EPIC"), Some(IssueType::Epic));
        assert_eq!(IssueType::parse("Spike"), None);
        let subtasks: Vec<_> = IssueType::ALL
            .into_iter()
            .filter(|ty| ty.is_subtask())
            .collect();
        assert_eq!(subtasks, vec![IssueType::Subtask]);
    }

    #[test]
    fn split_key_requires_numeric_suffix() {
        assert_eq!(split_key("PHX-8"), Some(("PHX", 8)));
        assert_eq!(split_key("MY-APP-21"), Some(("MY-APP", 21)));
        assert_eq!(split_key("PHX-x"), None);
        assert_eq!(split_key("-4"), None);
    }

    #[test]
    fn set_labels_drops_blank_and_duplicate_labels() {
        let mut issue = Issue::new("i-1", "PHX-1", IssueType::Task, "t", "u-1");
        issue.set_labels(vec![
            "api".to_string(),
            " ".to_string(),
            "api".to_string(),
            "web".to_string(),
        ]);
        assert_eq!(issue.labels, vec!["api".to_string(), "web".to_string()]);
    }
}
