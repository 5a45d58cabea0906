//! One function per tool.
//!
//! Read-only tools work on a fresh [`Dataset`] snapshot. Mutating tools run
//! inside [`TrackerServer::mutate`]: everything is validated and applied in
//! memory, and the issue file is written once when the mutator succeeds.

use super::format::{
    issue_type_shapes, project_shape, to_external_shape, user_shape,
};
use super::tools::{
    AddCommentToJiraIssueTool, AtlassianUserInfoTool, CreateJiraIssueTool, EditJiraIssueTool,
    GetAccessibleAtlassianResourcesTool, GetIssueHierarchyTool, GetJiraIssueTool,
    GetJiraIssueTypeMetaWithFieldsTool, GetJiraProjectIssueTypesMetadataTool,
    GetTransitionsForJiraIssueTool, GetVisibleJiraProjectsTool, LinkIssuesTool,
    LookupJiraAccountIdTool, MoveIssueInHierarchyTool, SearchJiraIssuesUsingJqlTool,
    TransitionJiraIssueTool,
};
use super::{ToolError, TrackerServer};
use canopy_store::{
    Dataset, Issue, IssuePriority, IssueStatus, IssueType, LinkAction, LinkType, User,
};
use serde_json::{Value, json};
use uuid::Uuid;

/// Workflow transitions: `(id, target status)`. The transition name is the
/// target status name.
const TRANSITIONS: [(&str, IssueStatus); 4] = [
    ("11", IssueStatus::Todo),
    ("21", IssueStatus::InProgress),
    ("31", IssueStatus::InReview),
    ("41", IssueStatus::Done),
];

const TRANSITION_SYNONYMS: &[(&str, IssueStatus)] = &[
    ("start progress", IssueStatus::InProgress),
    ("start", IssueStatus::InProgress),
    ("begin", IssueStatus::InProgress),
    ("stop progress", IssueStatus::Todo),
    ("reopen", IssueStatus::Todo),
    ("back to do", IssueStatus::Todo),
    ("submit for review", IssueStatus::InReview),
    ("request review", IssueStatus::InReview),
    ("ready for review", IssueStatus::InReview),
    ("resolve", IssueStatus::Done),
    ("close", IssueStatus::Done),
    ("finish", IssueStatus::Done),
    ("mark done", IssueStatus::Done),
];

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn saturating_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn find_issue<'a>(dataset: &'a Dataset, id_or_key: &str) -> Result<&'a Issue, ToolError> {
    dataset
        .issue(id_or_key.trim())
        .ok_or_else(|| ToolError::issue_not_found(id_or_key))
}

pub(crate) fn search_issues(
    server: &TrackerServer,
    tool: SearchJiraIssuesUsingJqlTool,
) -> Result<Value, ToolError> {
    let dataset = server.load()?;
    let matches = canopy_query::search(&tool.jql, dataset.issues());
    let total = matches.len();
    let start_at = tool.start_at.map_or(0, saturating_usize);
    let max_results = tool
        .max_results
        .map_or(server.config().default_max_results, saturating_usize);
    let page: Vec<_> = matches
        .into_iter()
        .skip(start_at)
        .take(max_results)
        .map(to_external_shape)
        .collect();

    tracing::debug!(jql = %tool.jql, total, returned = page.len(), "search");
    Ok(json!({
        "startAt": start_at,
        "maxResults": max_results,
        "total": total,
        "issues": page
    }))
}

pub(crate) fn get_issue(server: &TrackerServer, tool: GetJiraIssueTool) -> Result<Value, ToolError> {
    let dataset = server.load()?;
    let issue = find_issue(&dataset, &tool.issue_id_or_key)?;
    Ok(json!(to_external_shape(issue)))
}

pub(crate) fn create_issue(
    server: &TrackerServer,
    tool: CreateJiraIssueTool,
) -> Result<Value, ToolError> {
    const TOOL: &str = "createJiraIssue";

    let issue_type = IssueType::parse(&tool.issue_type_name)
        .ok_or_else(|| ToolError::InvalidType(tool.issue_type_name.clone()))?;
    let priority = match non_empty(tool.priority.clone()) {
        Some(raw) => IssuePriority::parse(&raw)
            .ok_or_else(|| ToolError::invalid_arguments(TOOL, format!("invalid priority `{raw}`")))?,
        None => IssuePriority::default(),
    };
    let summary = tool.summary.trim().to_string();
    if summary.is_empty() {
        return Err(ToolError::invalid_arguments(TOOL, "summary must not be empty"));
    }
    let configured_account = server.config().account_id.clone();

    server.mutate(|dataset| {
        let project = dataset.require_project(&tool.project_key)?;
        let project_key = project.key.clone();
        let reporter = match non_empty(tool.reporter.clone())
            .or(configured_account)
            .or_else(|| project.lead.clone())
        {
            Some(reporter) => reporter,
            None => acting_user(dataset, None)?.id.clone(),
        };
        let parent_id = match non_empty(tool.parent.clone()) {
            Some(parent) => Some(find_issue(dataset, &parent)?.id.clone()),
            None => None,
        };

        let id = Uuid::new_v4().to_string();
        let key = dataset.next_issue_key(&project_key);
        let mut issue = Issue::new(id.clone(), key, issue_type, summary, reporter);
        issue.priority = priority;
        issue.description = tool.description.clone();
        issue.assignee = non_empty(tool.assignee.clone());
        if let Some(labels) = tool.labels.clone() {
            issue.set_labels(labels);
        }
        dataset.insert_issue(issue)?;
        if let Some(parent_id) = parent_id {
            dataset.move_issue(&id, Some(&parent_id))?;
        }

        let created = dataset.require_issue(&id)?;
        tracing::info!(key = %created.key, issue_type = created.issue_type.as_str(), "created issue");
        Ok((json!(to_external_shape(created)), true))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
    Summary,
    Description,
    Priority,
    Labels,
    Assignee,
    DueDate,
    StartDate,
    StoryPoints,
    Sprint,
}

/// External field name → record field. Lookup is case-insensitive.
const EDIT_FIELD_ALIASES: &[(&str, EditField)] = &[
    ("summary", EditField::Summary),
    ("title", EditField::Summary),
    ("description", EditField::Description),
    ("priority", EditField::Priority),
    ("labels", EditField::Labels),
    ("assignee", EditField::Assignee),
    ("duedate", EditField::DueDate),
    ("startdate", EditField::StartDate),
    ("storypoints", EditField::StoryPoints),
    ("customfield_10016", EditField::StoryPoints),
    ("sprint", EditField::Sprint),
];

impl EditField {
    fn resolve(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        EDIT_FIELD_ALIASES
            .iter()
            .find(|(alias, _)| *alias == wanted)
            .map(|(_, field)| *field)
    }
}

fn optional_text(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(raw) if raw.trim().is_empty() => Some(None),
        Value::String(raw) => Some(Some(raw.trim().to_string())),
        _ => None,
    }
}

/// Apply one field. `false` means the value was rejected and nothing changed.
fn apply_edit(dataset: &Dataset, issue: &mut Issue, field: EditField, value: &Value) -> bool {
    match field {
        EditField::Summary => match value.as_str().map(str::trim) {
            Some(summary) if !summary.is_empty() => {
                issue.title = summary.to_string();
                true
            }
            _ => false,
        },
        EditField::Description => match value {
            Value::Null => {
                issue.description = None;
                true
            }
            Value::String(text) => {
                issue.description = Some(text.clone());
                true
            }
            _ => false,
        },
        EditField::Priority => match value.as_str().and_then(IssuePriority::parse) {
            Some(priority) => {
                issue.priority = priority;
                true
            }
            None => false,
        },
        EditField::Labels => match value {
            Value::Null => {
                issue.set_labels(Vec::new());
                true
            }
            Value::Array(items) => {
                let labels: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect();
                match labels {
                    Some(labels) => {
                        issue.set_labels(labels);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        },
        EditField::Assignee => match optional_text(value) {
            Some(assignee) => {
                issue.assignee = assignee;
                true
            }
            None => false,
        },
        EditField::DueDate => match optional_text(value) {
            Some(due) => {
                issue.due_date = due;
                true
            }
            None => false,
        },
        EditField::StartDate => match optional_text(value) {
            Some(start) => {
                issue.start_date = start;
                true
            }
            None => false,
        },
        EditField::StoryPoints => match value {
            Value::Null => {
                issue.story_points = None;
                true
            }
            Value::Number(points) => {
                issue.story_points = Some(points.clone());
                true
            }
            _ => false,
        },
        EditField::Sprint => match optional_text(value) {
            Some(None) => {
                issue.sprint = None;
                true
            }
            Some(Some(wanted)) => {
                let sprint = dataset.sprint(&wanted).or_else(|| {
                    dataset
                        .sprints()
                        .iter()
                        .find(|sprint| sprint.name.eq_ignore_ascii_case(&wanted))
                });
                match sprint {
                    Some(sprint) => {
                        issue.sprint = Some(sprint.id.clone());
                        true
                    }
                    None => false,
                }
            }
            None => false,
        },
    }
}

/// `fields` stays a raw JSON object: an explicit `null` clears a field, and a
/// value of the wrong type is reported per field instead of failing the call.
pub(crate) fn edit_issue(server: &TrackerServer, tool: EditJiraIssueTool) -> Result<Value, ToolError> {
    server.mutate(|dataset| {
        let target = find_issue(dataset, &tool.issue_id_or_key)?.id.clone();
        let mut edited = dataset.require_issue(&target)?.clone();

        let mut updated_fields = Vec::new();
        let mut ignored_fields = Vec::new();
        for (name, value) in &tool.fields {
            let Some(field) = EditField::resolve(name) else {
                tracing::debug!(field = %name, "ignoring unknown edit field");
                continue;
            };
            if apply_edit(dataset, &mut edited, field, value) {
                updated_fields.push(name.clone());
            } else {
                ignored_fields.push(name.clone());
            }
        }

        let changed = !updated_fields.is_empty();
        let issue = dataset
            .issue_mut(&target)
            .ok_or_else(|| ToolError::issue_not_found(&tool.issue_id_or_key))?;
        if changed {
            *issue = edited;
            issue.touch_updated_at();
        }
        Ok((
            json!({
                "issue": to_external_shape(issue),
                "updatedFields": updated_fields,
                "ignoredFields": ignored_fields
            }),
            changed,
        ))
    })
}

fn normalize_transition(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Synonyms first, then transition ids, then the literal status value.
fn resolve_transition(raw: &str) -> Option<IssueStatus> {
    let wanted = normalize_transition(raw);
    TRANSITION_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == wanted)
        .map(|(_, status)| *status)
        .or_else(|| {
            TRANSITIONS
                .iter()
                .find(|(id, _)| *id == wanted)
                .map(|(_, status)| *status)
        })
        .or_else(|| IssueStatus::parse(raw))
}

fn transition_shape(id: &str, status: IssueStatus) -> Value {
    json!({
        "id": id,
        "name": status.as_str(),
        "to": { "name": status.as_str() }
    })
}

pub(crate) fn transition_issue(
    server: &TrackerServer,
    tool: TransitionJiraIssueTool,
) -> Result<Value, ToolError> {
    server.mutate(|dataset| {
        let target = find_issue(dataset, &tool.issue_id_or_key)?.id.clone();
        let status = resolve_transition(&tool.transition)
            .ok_or_else(|| ToolError::InvalidTransition(tool.transition.clone()))?;
        let issue = dataset
            .issue_mut(&target)
            .ok_or_else(|| ToolError::issue_not_found(&tool.issue_id_or_key))?;
        let previous = issue.status;
        issue.set_status(status);

        tracing::info!(key = %issue.key, from = previous.as_str(), to = status.as_str(), "transitioned issue");
        Ok((
            json!({
                "issue": to_external_shape(issue),
                "from": previous.as_str(),
                "to": status.as_str()
            }),
            true,
        ))
    })
}

pub(crate) fn list_transitions(
    server: &TrackerServer,
    tool: GetTransitionsForJiraIssueTool,
) -> Result<Value, ToolError> {
    let dataset = server.load()?;
    let issue = find_issue(&dataset, &tool.issue_id_or_key)?;
    let transitions: Vec<Value> = TRANSITIONS
        .iter()
        .filter(|(_, status)| *status != issue.status)
        .map(|(id, status)| transition_shape(id, *status))
        .collect();
    Ok(json!({ "transitions": transitions }))
}

pub(crate) fn list_projects(
    server: &TrackerServer,
    _tool: GetVisibleJiraProjectsTool,
) -> Result<Value, ToolError> {
    let dataset = server.load()?;
    let projects: Vec<_> = dataset.projects().iter().map(project_shape).collect();
    Ok(json!({ "total": projects.len(), "values": projects }))
}

pub(crate) fn list_issue_types(
    _server: &TrackerServer,
    tool: GetJiraProjectIssueTypesMetadataTool,
) -> Result<Value, ToolError> {
    let issue_types = issue_type_shapes();
    Ok(json!({
        "projectIdOrKey": tool.project_id_or_key,
        "total": issue_types.len(),
        "issueTypes": issue_types
    }))
}

/// Constant field table. Every issue type accepts the same fields, so the
/// project and issue type arguments do not change the answer.
pub(crate) fn list_fields(
    _server: &TrackerServer,
    tool: GetJiraIssueTypeMetaWithFieldsTool,
) -> Result<Value, ToolError> {
    let priorities: Vec<Value> = IssuePriority::ALL
        .into_iter()
        .map(|priority| json!({ "name": priority.as_str() }))
        .collect();
    let fields = json!([
        { "fieldId": "summary", "name": "Summary", "required": true, "schema": { "type": "string" } },
        { "fieldId": "issuetype", "name": "Issue Type", "required": true, "schema": { "type": "issuetype" } },
        { "fieldId": "project", "name": "Project", "required": true, "schema": { "type": "project" } },
        { "fieldId": "description", "name": "Description", "required": false, "schema": { "type": "string" } },
        { "fieldId": "priority", "name": "Priority", "required": false, "schema": { "type": "priority" }, "allowedValues": priorities },
        { "fieldId": "labels", "name": "Labels", "required": false, "schema": { "type": "array", "items": "string" } },
        { "fieldId": "assignee", "name": "Assignee", "required": false, "schema": { "type": "user" } },
        { "fieldId": "reporter", "name": "Reporter", "required": false, "schema": { "type": "user" } },
        { "fieldId": "parent", "name": "Parent", "required": false, "schema": { "type": "issuelink" } },
        { "fieldId": "duedate", "name": "Due date", "required": false, "schema": { "type": "date" } },
        { "fieldId": "startDate", "name": "Start date", "required": false, "schema": { "type": "date" } },
        { "fieldId": "customfield_10016", "name": "Story Points", "required": false, "schema": { "type": "number" } },
        { "fieldId": "sprint", "name": "Sprint", "required": false, "schema": { "type": "string" } }
    ]);
    Ok(json!({
        "projectKey": tool.project_key,
        "issueTypeId": tool.issue_type_id,
        "fields": fields
    }))
}

pub(crate) fn find_users(
    server: &TrackerServer,
    tool: LookupJiraAccountIdTool,
) -> Result<Value, ToolError> {
    let dataset = server.load()?;
    let users: Vec<_> = dataset
        .users()
        .iter()
        .filter(|user| user.matches_search(&tool.search_string))
        .map(user_shape)
        .collect();
    Ok(json!({ "total": users.len(), "users": users }))
}

pub(crate) fn add_comment(
    server: &TrackerServer,
    tool: AddCommentToJiraIssueTool,
) -> Result<Value, ToolError> {
    if tool.comment_body.trim().is_empty() {
        return Err(ToolError::invalid_arguments(
            "addCommentToJiraIssue",
            "commentBody must not be empty",
        ));
    }
    let dataset = server.load()?;
    let issue = find_issue(&dataset, &tool.issue_id_or_key)?;
    let comment = server.comments().append(
        &issue.id,
        &tool.comment_body,
        server.config().account_id.as_deref(),
    );
    Ok(json!({
        "id": comment.id,
        "issueId": issue.id,
        "issueKey": issue.key,
        "body": comment.body,
        "author": comment.author.map(|account_id| json!({ "accountId": account_id })),
        "created": comment.created,
        "total": server.comments().comments_for(&issue.id).len()
    }))
}

pub(crate) fn get_hierarchy(
    server: &TrackerServer,
    tool: GetIssueHierarchyTool,
) -> Result<Value, ToolError> {
    let dataset = server.load()?;
    let issue = find_issue(&dataset, &tool.issue_id_or_key)?;
    let parent = dataset.parent_of(issue).map(to_external_shape);
    let children: Vec<Value> = dataset
        .descendants_breadth_first(issue, tool.depth.map(saturating_usize))
        .into_iter()
        .map(|(depth, child)| json!({ "depth": depth, "issue": to_external_shape(child) }))
        .collect();
    Ok(json!({
        "issue": to_external_shape(issue),
        "parent": parent,
        "children": children
    }))
}

pub(crate) fn move_in_hierarchy(
    server: &TrackerServer,
    tool: MoveIssueInHierarchyTool,
) -> Result<Value, ToolError> {
    let new_parent = non_empty(tool.new_parent_key.clone());
    server.mutate(|dataset| {
        let outcome = dataset.move_issue(tool.issue_id_or_key.trim(), new_parent.as_deref())?;
        let moved = dataset.require_issue(&outcome.issue_id)?;
        Ok((
            json!({
                "issue": to_external_shape(moved),
                "previousParentId": outcome.previous_parent_id,
                "newParentId": outcome.new_parent_id
            }),
            true,
        ))
    })
}

pub(crate) fn link_issues(server: &TrackerServer, tool: LinkIssuesTool) -> Result<Value, ToolError> {
    let link_type = LinkType::parse(&tool.link_type)?;
    let action = LinkAction::parse(&tool.action)?;
    server.mutate(|dataset| {
        let outcome = dataset.link_issues(
            tool.source_key.trim(),
            tool.target_key.trim(),
            link_type,
            action,
        )?;
        tracing::info!(
            source = %outcome.source_key,
            target = %outcome.target_key,
            link_type = link_type.as_str(),
            action = action.as_str(),
            changed = outcome.changed,
            "linked issues"
        );
        Ok((
            json!({
                "sourceKey": outcome.source_key,
                "targetKey": outcome.target_key,
                "linkType": outcome.link_type.as_str(),
                "action": outcome.action.as_str(),
                "changed": outcome.changed
            }),
            true,
        ))
    })
}

fn acting_user<'a>(dataset: &'a Dataset, account_id: Option<&str>) -> Result<&'a User, ToolError> {
    match account_id {
        Some(account_id) => dataset
            .user(account_id)
            .ok_or_else(|| ToolError::NotFound(format!("user not found: {account_id}"))),
        None => dataset
            .users()
            .first()
            .ok_or_else(|| ToolError::NotFound("no users defined".to_string())),
    }
}

pub(crate) fn current_user(
    server: &TrackerServer,
    _tool: AtlassianUserInfoTool,
) -> Result<Value, ToolError> {
    let dataset = server.load()?;
    let user = acting_user(&dataset, server.config().account_id.as_deref())?;
    Ok(json!(user_shape(user)))
}

pub(crate) fn list_resources(
    server: &TrackerServer,
    _tool: GetAccessibleAtlassianResourcesTool,
) -> Result<Value, ToolError> {
    let site = &server.config().site;
    Ok(json!([{
        "id": site.cloud_id,
        "name": site.name,
        "url": site.url,
        "scopes": ["read:jira-work", "write:jira-work", "read:jira-user"],
        "avatarUrl": Value::Null
    }]))
}
