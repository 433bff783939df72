//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use std::sync::Arc;

use crate::tools::{
    SwFetchParams, SwMessageParams, SwNotificationClickParams, SwPushParams, SwSyncParams, fetch_impl, message_impl,
    notification_click_impl, push_impl, status_impl, sync_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::ServiceWorker;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<ServiceWorker>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a server handler around a started worker.
    pub fn new(worker: Arc<ServiceWorker>) -> Self {
        Self { tool_router: Self::tool_router(), worker }
    }

    #[tool(
        description = "Deliver a fetch event to the worker. Returns the response with its resource class, caching policy and source (cache, network, offline_page, synthesized)."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Post a control message (CACHE_URLS, CLEAR_CACHE, GET_CACHE_SIZE) to the worker. GET_CACHE_SIZE replies with {size}."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push event. Returns the notification the worker shows.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a notification click. Returns the URL of the window to open.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a background sync event for a tag. Only 'background-sync' is handled.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report the worker lifecycle state, buckets, stored URLs and current cache size.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
