//! Tool catalog: one input struct per MCP tool.
//!
//! Names and argument spellings follow the Atlassian MCP surface so existing
//! clients can point at this server unchanged. `cloudId` is accepted
//! everywhere and ignored.

use rust_mcp_sdk::macros::{JsonSchema, mcp_tool};
use rust_mcp_sdk::tool_box;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Access to the arguments every tool shares.
pub(crate) trait ToolArgs {
    fn cloud_id(&self) -> Option<&str>;
}

macro_rules! impl_tool_args {
    ($($tool:ty),+ $(,)?) => {
        $(
            impl ToolArgs for $tool {
                fn cloud_id(&self) -> Option<&str> {
                    self.cloud_id.as_deref()
                }
            }
        )+
    };
}

#[mcp_tool(
    name = "searchJiraIssuesUsingJql",
    description = "Search issues with a JQL-style filter (AND-joined comparisons and IN lists)",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchJiraIssuesUsingJqlTool {
    pub jql: String,
    #[serde(default)]
    pub start_at: Option<u64>,
    #[serde(default)]
    pub max_results: Option<u64>,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "getJiraIssue",
    description = "Get one issue by id or key",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetJiraIssueTool {
    pub issue_id_or_key: String,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "createJiraIssue",
    description = "Create an issue in a project; the key is allocated sequentially",
    read_only_hint = false,
    idempotent_hint = false
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJiraIssueTool {
    pub project_key: String,
    pub issue_type_name: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Parent issue id or key
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "editJiraIssue",
    description = "Update issue fields; null clears a nullable field",
    read_only_hint = false,
    idempotent_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditJiraIssueTool {
    pub issue_id_or_key: String,
    /// Field name to new value: summary, description, priority, labels,
    /// assignee, duedate, startDate, storyPoints (customfield_10016), sprint
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "transitionJiraIssue",
    description = "Move an issue to another workflow status by transition name, id or status",
    read_only_hint = false,
    idempotent_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionJiraIssueTool {
    pub issue_id_or_key: String,
    pub transition: String,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "getVisibleJiraProjects",
    description = "List all projects",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetVisibleJiraProjectsTool {
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "getJiraProjectIssueTypesMetadata",
    description = "List the issue types available in a project",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetJiraProjectIssueTypesMetadataTool {
    #[serde(default)]
    pub project_id_or_key: Option<String>,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "getJiraIssueTypeMetaWithFields",
    description = "Describe the fields accepted when creating or editing an issue",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetJiraIssueTypeMetaWithFieldsTool {
    pub project_key: String,
    pub issue_type_id: String,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "getTransitionsForJiraIssue",
    description = "List the transitions available from an issue's current status",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetTransitionsForJiraIssueTool {
    pub issue_id_or_key: String,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "lookupJiraAccountId",
    description = "Find users whose display name or email contains the search string",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LookupJiraAccountIdTool {
    pub search_string: String,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "addCommentToJiraIssue",
    description = "Add a comment to an issue (kept for the lifetime of the server)",
    read_only_hint = false,
    idempotent_hint = false
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentToJiraIssueTool {
    pub issue_id_or_key: String,
    pub comment_body: String,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "getIssueHierarchy",
    description = "Get an issue with its parent and descendants, breadth first",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetIssueHierarchyTool {
    pub issue_id_or_key: String,
    /// Levels of children to include; all levels when omitted
    #[serde(default)]
    pub depth: Option<u64>,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "moveIssueInHierarchy",
    description = "Re-parent an issue, or detach it when newParentKey is omitted",
    read_only_hint = false,
    idempotent_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveIssueInHierarchyTool {
    pub issue_id_or_key: String,
    #[serde(default)]
    pub new_parent_key: Option<String>,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "linkIssues",
    description = "Create or remove a blocks, blocked_by or relates_to link between two issues",
    read_only_hint = false,
    idempotent_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkIssuesTool {
    pub source_key: String,
    pub target_key: String,
    pub link_type: String,
    pub action: String,
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "atlassianUserInfo",
    description = "Describe the account this server acts as",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct AtlassianUserInfoTool {
    #[serde(default)]
    pub cloud_id: Option<String>,
}

#[mcp_tool(
    name = "getAccessibleAtlassianResources",
    description = "List the sites this server exposes (always exactly one)",
    read_only_hint = true
)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetAccessibleAtlassianResourcesTool {
    #[serde(default)]
    pub cloud_id: Option<String>,
}

impl_tool_args!(
    SearchJiraIssuesUsingJqlTool,
    GetJiraIssueTool,
    CreateJiraIssueTool,
    EditJiraIssueTool,
    TransitionJiraIssueTool,
    GetVisibleJiraProjectsTool,
    GetJiraProjectIssueTypesMetadataTool,
    GetJiraIssueTypeMetaWithFieldsTool,
    GetTransitionsForJiraIssueTool,
    LookupJiraAccountIdTool,
    AddCommentToJiraIssueTool,
    GetIssueHierarchyTool,
    MoveIssueInHierarchyTool,
    LinkIssuesTool,
    AtlassianUserInfoTool,
    GetAccessibleAtlassianResourcesTool,
);

tool_box!(
    IssueTrackerTools,
    [
        SearchJiraIssuesUsingJqlTool,
        GetJiraIssueTool,
        CreateJiraIssueTool,
        EditJiraIssueTool,
        TransitionJiraIssueTool,
        GetVisibleJiraProjectsTool,
        GetJiraProjectIssueTypesMetadataTool,
        GetJiraIssueTypeMetaWithFieldsTool,
        GetTransitionsForJiraIssueTool,
        LookupJiraAccountIdTool,
        AddCommentToJiraIssueTool,
        GetIssueHierarchyTool,
        MoveIssueInHierarchyTool,
        LinkIssuesTool,
        AtlassianUserInfoTool,
        GetAccessibleAtlassianResourcesTool
    ]
);
