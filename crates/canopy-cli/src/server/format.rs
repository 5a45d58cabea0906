//! External response shapes.
//!
//! Records are re-shaped into the field layout Jira clients expect:
//! `{id, key, fields: {...}}` with `summary` instead of `title` and the
//! enumerations nested as `{name}` objects. Everything here is a pure
//! borrow of the stored record.

use canopy_store::{Issue, IssueType, Project, User};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

#[derive(Debug, Serialize)]
pub struct ApiIssue<'a> {
    pub id: &'a str,
    pub key: &'a str,
    pub fields: ApiIssueFields<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIssueFields<'a> {
    pub summary: &'a str,
    pub description: Option<&'a str>,
    pub issuetype: Named<'a>,
    pub status: Named<'a>,
    pub priority: Named<'a>,
    pub assignee: Option<AccountRef<'a>>,
    pub reporter: AccountRef<'a>,
    pub parent: Option<IdRef<'a>>,
    pub labels: &'a [String],
    pub child_ids: &'a [String],
    pub blocks: &'a [String],
    pub blocked_by: &'a [String],
    pub related_to: &'a [String],
    pub sprint: Option<&'a str>,
    pub story_points: Option<&'a Number>,
    pub due_date: Option<&'a str>,
    pub start_date: Option<&'a str>,
    pub created_at: &'a DateTime<Utc>,
    pub updated_at: &'a DateTime<Utc>,
    #[serde(flatten)]
    pub extra: PassthroughFields<'a>,
}

/// Field names the shaped layout owns, plus the stored `title`.
const SHAPED_FIELD_NAMES: &[&str] = &[
    "summary",
    "title",
    "description",
    "issuetype",
    "status",
    "priority",
    "assignee",
    "reporter",
    "parent",
    "labels",
    "childIds",
    "blocks",
    "blockedBy",
    "relatedTo",
    "sprint",
    "storyPoints",
    "dueDate",
    "startDate",
    "createdAt",
    "updatedAt",
];

/// Opaque stored keys, minus any that would collide with a shaped field.
#[derive(Debug)]
pub struct PassthroughFields<'a>(&'a Map<String, Value>);

impl Serialize for PassthroughFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .filter(|(name, _)| !SHAPED_FIELD_NAMES.contains(&name.as_str())),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct Named<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef<'a> {
    pub account_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct IdRef<'a> {
    pub id: &'a str,
}

pub fn to_external_shape(issue: &Issue) -> ApiIssue<'_> {
    ApiIssue {
        id: &issue.id,
        key: &issue.key,
        fields: ApiIssueFields {
            summary: &issue.title,
            description: issue.description.as_deref(),
            issuetype: Named {
                name: issue.issue_type.as_str(),
            },
            status: Named {
                name: issue.status.as_str(),
            },
            priority: Named {
                name: issue.priority.as_str(),
            },
            assignee: issue
                .assignee
                .as_deref()
                .map(|account_id| AccountRef { account_id }),
            reporter: AccountRef {
                account_id: &issue.reporter,
            },
            parent: issue.parent_id().map(|id| IdRef { id }),
            labels: &issue.labels,
            child_ids: issue.child_ids(),
            blocks: issue.blocks(),
            blocked_by: issue.blocked_by(),
            related_to: issue.related_to(),
            sprint: issue.sprint.as_deref(),
            story_points: issue.story_points.as_ref(),
            due_date: issue.due_date.as_deref(),
            start_date: issue.start_date.as_deref(),
            created_at: &issue.created_at,
            updated_at: &issue.updated_at,
            extra: PassthroughFields(&issue.extra),
        },
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser<'a> {
    pub account_id: &'a str,
    pub display_name: &'a str,
    pub email_address: &'a str,
    pub active: bool,
}

pub fn user_shape(user: &User) -> ApiUser<'_> {
    ApiUser {
        account_id: &user.id,
        display_name: &user.display_name,
        email_address: &user.email,
        active: true,
    }
}

#[derive(Debug, Serialize)]
pub struct ApiProject<'a> {
    pub id: &'a str,
    pub key: &'a str,
    pub name: &'a str,
    pub lead: Option<AccountRef<'a>>,
}

pub fn project_shape(project: &Project) -> ApiProject<'_> {
    ApiProject {
        id: &project.id,
        key: &project.key,
        name: &project.name,
        lead: project
            .lead
            .as_deref()
            .map(|account_id| AccountRef { account_id }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIssueType {
    pub id: String,
    pub name: &'static str,
    pub subtask: bool,
    pub is_subtask: bool,
    pub hierarchy_level: i32,
}

/// Issue types in catalog order. Ids are stable positions in that order.
pub fn issue_type_shapes() -> Vec<ApiIssueType> {
    IssueType::ALL
        .into_iter()
        .enumerate()
        .map(|(idx, issue_type)| ApiIssueType {
            id: (10_001 + idx).to_string(),
            name: issue_type.as_str(),
            subtask: issue_type.is_subtask(),
            is_subtask: issue_type.is_subtask(),
            hierarchy_level: issue_type.hierarchy_level(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_store::{IssuePriority, IssueStatus};
    use serde_json::json;

    fn sample_issue() -> Issue {
        let mut issue = Issue::new("i-1", "PHX-1", IssueType::Bug, "Login page crashes", "u-1");
        issue.status = IssueStatus::InReview;
        issue.priority = IssuePriority::High;
        issue.labels = vec!["auth".to_string()];
        issue.story_points = Some(5.into());
        issue
            .extra
            .insert("originalEstimate".to_string(), json!("2d"));
        issue
    }

    #[test]
    fn issue_shape_uses_summary_and_nested_names() {
        let value = serde_json::to_value(to_external_shape(&sample_issue()))
            .expect("issue shape should serialize");

        assert_eq!(value["id"], "i-1");
        assert_eq!(value["key"], "PHX-1");
        let fields = &value["fields"];
        assert_eq!(fields["summary"], "Login page crashes");
        assert!(fields.get("title").is_none());
        assert!(value.get("title").is_none());
        assert_eq!(fields["issuetype"], json!({"name": "Bug"}));
        assert_eq!(fields["status"], json!({"name": "In Review"}));
        assert_eq!(fields["priority"], json!({"name": "High"}));
        assert_eq!(fields["reporter"], json!({"accountId": "u-1"}));
        assert_eq!(fields["assignee"], Value::Null);
        assert_eq!(fields["parent"], Value::Null);
        assert_eq!(fields["labels"], json!(["auth"]));
        assert_eq!(fields["storyPoints"], 5);
        assert_eq!(fields["childIds"], json!([]));
        assert_eq!(fields["originalEstimate"], "2d");
        assert!(fields["createdAt"].is_string());
    }

    #[test]
    fn stored_extras_never_override_shaped_fields() {
        let mut issue = sample_issue();
        for (name, value) in [
            ("summary", json!("stale imported summary")),
            ("title", json!("stale title")),
            ("issuetype", json!("Story")),
            ("parent", json!("legacy")),
        ] {
            issue.extra.insert(name.to_string(), value);
        }

        let text = serde_json::to_string(&to_external_shape(&issue)).expect("should serialize");
        assert_eq!(text.matches("\"summary\"").count(), 1);
        assert_eq!(text.matches("\"issuetype\"").count(), 1);
        assert_eq!(text.matches("\"parent\"").count(), 1);

        let value: Value = serde_json::from_str(&text).expect("shape should parse");
        let fields = &value["fields"];
        assert_eq!(fields["summary"], "Login page crashes");
        assert_eq!(fields["issuetype"], json!({"name": "Bug"}));
        assert_eq!(fields["parent"], Value::Null);
        assert!(fields.get("title").is_none());
        assert_eq!(fields["originalEstimate"], "2d");
    }

    #[test]
    fn assignee_and_parent_nest_as_references() {
        let mut issue = sample_issue();
        issue.assignee = Some("u-2".to_string());
        let value = serde_json::to_value(to_external_shape(&issue)).expect("should serialize");
        assert_eq!(value["fields"]["assignee"], json!({"accountId": "u-2"}));
    }

    #[test]
    fn user_and_project_shapes_follow_account_conventions() {
        let user: User = serde_json::from_value(json!({
            "id": "u-1",
            "displayName": "Ada Lovelace",
            "email": "ada@example.com"
        }))
        .expect("user should decode");
        assert_eq!(
            serde_json::to_value(user_shape(&user)).expect("should serialize"),
            json!({
                "accountId": "u-1",
                "displayName": "Ada Lovelace",
                "emailAddress": "ada@example.com",
                "active": true
            })
        );

        let project: Project = serde_json::from_value(json!({
            "id": "p-1", "key": "PHX", "name": "Phoenix", "lead": "u-1"
        }))
        .expect("project should decode");
        assert_eq!(
            serde_json::to_value(project_shape(&project)).expect("should serialize"),
            json!({"id": "p-1", "key": "PHX", "name": "Phoenix", "lead": {"accountId": "u-1"}})
        );
    }

    #[test]
    fn only_subtask_is_flagged_as_subtask() {
        let shapes = issue_type_shapes();
        assert_eq!(shapes.len(), 7);
        let flagged: Vec<&str> = shapes
            .iter()
            .filter(|shape| shape.is_subtask)
            .map(|shape| shape.name)
            .collect();
        assert_eq!(flagged, vec!["Subtask"]);
    }
}
