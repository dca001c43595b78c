//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheListParams, CacheSweepParams, list_impl, sweep_impl};
use crate::tools::dispatch::{ShimDispatchParams, dispatch_impl};
use crate::tools::fetch::{ShimFetchParams, fetch_impl};

use offcache_core::CacheDb;
use offcache_worker::{Janitor, Registration};
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

/// The main MCP server handler for offcache.
#[derive(Clone)]
pub struct ShimServer {
    registration: Arc<Registration>,
    store: CacheDb,
    janitor: Arc<Janitor>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ShimServer {
    pub fn new(registration: Arc<Registration>, store: CacheDb, janitor: Arc<Janitor>) -> Self {
        Self { registration, store, janitor, tool_router: Self::tool_router() }
    }

    /// Run a GET request through the active worker.
    #[tool(
        description = "Fetch a URL through the offline cache worker. Returns status, headers, body text, the strategy used, and whether the cache, network or an offline fallback answered."
    )]
    async fn shim_fetch(&self, params: Parameters<ShimFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.registration, params.0).await
    }

    #[tool(
        description = "Dispatch a worker event (install, activate, fetch, message, sync, push, notificationclick) and return its outcome."
    )]
    async fn shim_dispatch(&self, params: Parameters<ShimDispatchParams>) -> Result<CallToolResult, McpError> {
        dispatch_impl(&self.registration, params.0).await
    }

    #[tool(description = "List cache generations with their entry counts, oldest first.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.store, params.0).await
    }

    /// Run the janitor now instead of waiting for its next tick.
    #[tool(description = "Evict dynamic cache entries older than the retention window and report what was removed.")]
    async fn cache_sweep(&self, params: Parameters<CacheSweepParams>) -> Result<CallToolResult, McpError> {
        sweep_impl(&self.janitor, params.0).await
    }
}

impl ServerHandler for ShimServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offcache".into(),
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
