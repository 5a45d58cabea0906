//! Reference records the tool surface reads but never writes: projects,
//! users and sprints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub lead: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Case-insensitive substring match on display name or email.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        self.display_name.to_lowercase().contains(&needle)
            || self.email.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SprintStatus {
    #[default]
    #[serde(alias = "planned", alias = "future")]
    Planned,
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "completed", alias = "closed")]
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: SprintStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_search_matches_name_or_email_case_insensitively() {
        let user: User = serde_json::from_str(
            r#"{"id":"u-1","displayName":"Ada Lovelace","email":"ada@example.com"}"#,
        )
        .expect("user should decode");

        assert!(user.matches_search("LOVE"));
        assert!(user.matches_search("example.COM"));
        assert!(!user.matches_search("grace"));
    }

    #[test]
    fn sprint_status_accepts_lowercase_values() {
        let sprint: Sprint = serde_json::from_str(
            r#"{"id":"s-1","projectId":"p-1","name":"Sprint 1","status":"active","goal":"ship"}"#,
        )
        .expect("sprint should decode");
        assert_eq!(sprint.status, SprintStatus::Active);
        assert_eq!(sprint.extra["goal"], "ship");
    }
}
