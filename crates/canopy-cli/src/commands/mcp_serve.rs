use crate::server::TrackerServer;
use crate::server::tools::IssueTrackerTools;
use async_trait::async_trait;
use rust_mcp_sdk::{
    McpServer, StdioTransport, ToMcpServerHandler, TransportOptions,
    mcp_server::{McpServerOptions, ServerHandler, ServerRuntime, server_runtime},
    schema::{
        CallToolRequestParams, CallToolResult, Implementation, InitializeResult, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, RpcError, ServerCapabilities,
        ServerCapabilitiesTools, schema_utils::CallToolError,
    },
};
use std::process;
use std::sync::Arc;

pub struct Args {
    pub data_dir: Option<String>,
    pub config: Option<String>,
    pub server_name: String,
    pub server_version: String,
}

struct CanopyMcpHandler {
    server: Arc<TrackerServer>,
}

pub fn run(args: Args) {
    let config = super::resolve_config(args.config.as_deref(), args.data_dir.clone());

    eprintln!("canopy mcp-serve");
    eprintln!("  transport: stdio");
    eprintln!("  server: {} {}", args.server_name, args.server_version);
    eprintln!("  data dir: {}", config.data_dir.display());
    eprintln!("  default max results: {}", config.default_max_results);
    eprintln!(
        "  account: {}",
        config.account_id.as_deref().unwrap_or("(first user)")
    );
    eprintln!("  site: {} ({})", config.site.name, config.site.cloud_id);

    let server = Arc::new(TrackerServer::with_memory_comments(config));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });

    runtime.block_on(async move {
        if let Err(e) = run_async(server, args.server_name, args.server_version).await {
            eprintln!("error: mcp server failed: {e}");
            process::exit(1);
        }
    });
}

async fn run_async(
    server: Arc<TrackerServer>,
    server_name: String,
    server_version: String,
) -> Result<(), String> {
    let server_details = InitializeResult {
        server_info: Implementation {
            name: server_name,
            version: server_version,
            title: Some("Canopy Issue Tracker".into()),
            description: Some(
                "Jira-compatible MCP tool surface over a hierarchical flat-file issue store".into(),
            ),
            icons: vec![],
            website_url: Some("https://github.com/canopy-tracker/canopy".into()),
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            ..Default::default()
        },
        protocol_version: ProtocolVersion::V2025_11_25.into(),
        instructions: Some(
            "Use searchJiraIssuesUsingJql to find issues (AND-joined `field op value` comparisons and `field IN (...)` lists; unknown fields are ignored). getIssueHierarchy, moveIssueInHierarchy and linkIssues manage parent/child trees and blocks/relates_to links; moves that would create a cycle are rejected. cloudId is accepted on every tool and ignored."
                .into(),
        ),
        meta: None,
    };

    let transport = StdioTransport::new(TransportOptions::default()).map_err(|e| e.to_string())?;
    let handler = CanopyMcpHandler { server };

    let runtime: Arc<ServerRuntime> = server_runtime::create_server(McpServerOptions {
        server_details,
        transport,
        handler: handler.to_mcp_server_handler(),
        task_store: None,
        client_task_store: None,
    });

    runtime.start().await.map_err(|e| {
        e.rpc_error_message()
            .cloned()
            .unwrap_or_else(|| e.to_string())
    })
}

#[async_trait]
impl ServerHandler for CanopyMcpHandler {
    async fn handle_list_tools_request(
        &self,
        _params: Option<PaginatedRequestParams>,
        _runtime: Arc<dyn McpServer>,
    ) -> std::result::Result<ListToolsResult, RpcError> {
        Ok(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools: IssueTrackerTools::tools(),
        })
    }

    async fn handle_call_tool_request(
        &self,
        params: CallToolRequestParams,
        _runtime: Arc<dyn McpServer>,
    ) -> std::result::Result<CallToolResult, CallToolError> {
        tracing::info!(tool = %params.name, "tools/call");
        Ok(self.server.dispatch(&params.name, params.arguments))
    }
}
