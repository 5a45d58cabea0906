//! Queryable view of records: the field alias table and value extraction.

use canopy_store::Issue;

/// A record attribute as the evaluator sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Id,
    Key,
    Project,
    Type,
    Status,
    Priority,
    Summary,
    Description,
    Labels,
    Assignee,
    Reporter,
    Parent,
    Sprint,
    StoryPoints,
    DueDate,
    StartDate,
    Created,
    Updated,
}

const FIELD_ALIASES: &[(&str, QueryField)] = &[
    ("id", QueryField::Id),
    ("key", QueryField::Key),
    ("issuekey", QueryField::Key),
    ("project", QueryField::Project),
    ("type", QueryField::Type),
    ("issuetype", QueryField::Type),
    ("status", QueryField::Status),
    ("priority", QueryField::Priority),
    ("summary", QueryField::Summary),
    ("title", QueryField::Summary),
    ("description", QueryField::Description),
    ("labels", QueryField::Labels),
    ("label", QueryField::Labels),
    ("assignee", QueryField::Assignee),
    ("reporter", QueryField::Reporter),
    ("parent", QueryField::Parent),
    ("parentid", QueryField::Parent),
    ("sprint", QueryField::Sprint),
    ("storypoints", QueryField::StoryPoints),
    ("story_points", QueryField::StoryPoints),
    ("duedate", QueryField::DueDate),
    ("due", QueryField::DueDate),
    ("startdate", QueryField::StartDate),
    ("created", QueryField::Created),
    ("createdat", QueryField::Created),
    ("updated", QueryField::Updated),
    ("updatedat", QueryField::Updated),
];

impl QueryField {
    /// Resolve a query field name through the alias table (case-insensitive).
    pub fn resolve(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        FIELD_ALIASES
            .iter()
            .find(|(alias, _)| *alias == wanted)
            .map(|(_, field)| *field)
    }
}

/// Records the evaluator can filter.
pub trait QueryRecord {
    fn field_value(&self, field: QueryField) -> FieldValue;
}

impl QueryRecord for Issue {
    fn field_value(&self, field: QueryField) -> FieldValue {
        match field {
            QueryField::Id => text(&self.id),
            QueryField::Key => text(&self.key),
            QueryField::Project => text(self.project_key()),
            QueryField::Type => text(self.issue_type.as_str()),
            QueryField::Status => text(self.status.as_str()),
            QueryField::Priority => text(self.priority.as_str()),
            QueryField::Summary => text(&self.title),
            QueryField::Description => optional(self.description.as_deref()),
            QueryField::Labels => FieldValue::List(self.labels.clone()),
            QueryField::Assignee => optional(self.assignee.as_deref()),
            QueryField::Reporter => text(&self.reporter),
            QueryField::Parent => optional(self.parent_id()),
            QueryField::Sprint => optional(self.sprint.as_deref()),
            QueryField::StoryPoints => self
                .story_points
                .as_ref()
                .map_or(FieldValue::Null, |points| FieldValue::Text(points.to_string())),
            QueryField::DueDate => optional(self.due_date.as_deref()),
            QueryField::StartDate => optional(self.start_date.as_deref()),
            QueryField::Created => FieldValue::Text(self.created_at.to_rfc3339()),
            QueryField::Updated => FieldValue::Text(self.updated_at.to_rfc3339()),
        }
    }
}

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

fn optional(value: Option<&str>) -> FieldValue {
    value.map_or(FieldValue::Null, text)
}
