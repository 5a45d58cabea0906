//! Name-based dispatch and the result envelope.
//!
//! Every call ends in a `CallToolResult`: pretty JSON on success, or
//! `{"error": "..."}` with `isError: true`. Handler failures never surface
//! as transport errors.

use super::handlers;
use super::tools::ToolArgs;
use super::{ToolError, TrackerServer};
use rust_mcp_sdk::schema::{CallToolResult, TextContent};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::PoisonError;

fn decode<T>(tool: &str, arguments: Map<String, Value>) -> Result<T, ToolError>
where
    T: DeserializeOwned + ToolArgs,
{
    let args: T = serde_json::from_value(Value::Object(arguments))
        .map_err(|e| ToolError::invalid_arguments(tool, e.to_string()))?;
    tracing::debug!(tool, cloud_id = ?args.cloud_id(), "dispatching tool call");
    Ok(args)
}

impl TrackerServer {
    /// Run one tool call under the dispatch lock.
    pub fn execute(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<Value, ToolError> {
        let _serialized = self
            .dispatch_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let outcome = self.route(name, arguments.unwrap_or_default());
        if let Err(err) = &outcome {
            tracing::warn!(tool = name, error = %err, "tool call failed");
        }
        outcome
    }

    fn route(&self, name: &str, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        match name {
            "searchJiraIssuesUsingJql" => handlers::search_issues(self, decode(name, arguments)?),
            "getJiraIssue" => handlers::get_issue(self, decode(name, arguments)?),
            "createJiraIssue" => handlers::create_issue(self, decode(name, arguments)?),
            "editJiraIssue" => handlers::edit_issue(self, decode(name, arguments)?),
            "transitionJiraIssue" => handlers::transition_issue(self, decode(name, arguments)?),
            "getVisibleJiraProjects" => handlers::list_projects(self, decode(name, arguments)?),
            "getJiraProjectIssueTypesMetadata" => {
                handlers::list_issue_types(self, decode(name, arguments)?)
            }
            "getJiraIssueTypeMetaWithFields" => {
                handlers::list_fields(self, decode(name, arguments)?)
            }
            "getTransitionsForJiraIssue" => {
                handlers::list_transitions(self, decode(name, arguments)?)
            }
            "lookupJiraAccountId" => handlers::find_users(self, decode(name, arguments)?),
            "addCommentToJiraIssue" => handlers::add_comment(self, decode(name, arguments)?),
            "getIssueHierarchy" => handlers::get_hierarchy(self, decode(name, arguments)?),
            "moveIssueInHierarchy" => handlers::move_in_hierarchy(self, decode(name, arguments)?),
            "linkIssues" => handlers::link_issues(self, decode(name, arguments)?),
            "atlassianUserInfo" => handlers::current_user(self, decode(name, arguments)?),
            "getAccessibleAtlassianResources" => {
                handlers::list_resources(self, decode(name, arguments)?)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Run one tool call and wrap the outcome for the MCP transport.
    pub fn dispatch(&self, name: &str, arguments: Option<Map<String, Value>>) -> CallToolResult {
        match self.execute(name, arguments) {
            Ok(value) => success_envelope(&value),
            Err(err) => error_envelope(&err),
        }
    }
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult::text_content(vec![TextContent::from(text)])
}

pub fn success_envelope(value: &Value) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => text_result(text),
        Err(err) => error_envelope(&ToolError::invalid_arguments(
            "response",
            format!("failed to encode result: {err}"),
        )),
    }
}

pub fn error_envelope(err: &ToolError) -> CallToolResult {
    let mut result = text_result(json!({ "error": err.to_string() }).to_string());
    result.is_error = Some(true);
    result
}
