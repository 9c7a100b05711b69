//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use crate::tools::{
    Background,
    fetch::{WorkerFetchParams, fetch_impl},
    lifecycle::{WorkerMessageParams, activate_impl, install_impl, message_impl},
    notify::{NotificationClickParams, WorkerPushParams, click_impl, push_impl},
    status::status_impl,
    sync::{FormEnqueueParams, WorkerSyncParams, enqueue_impl, sync_impl},
};
use folio_worker::ServiceWorker;
use std::sync::Arc;
use url::Url;

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

/// The main MCP server handler for folio-sw.
#[derive(Clone)]
pub struct FolioServer {
    worker: Arc<ServiceWorker>,
    background: Background,
    origin: Url,
    sync_tag: String,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl FolioServer {
    /// Create a new server handler around a registered worker. Keep-alive
    /// tasks from tool calls are collected in `background`.
    pub fn new(worker: Arc<ServiceWorker>, background: Background, origin: Url, sync_tag: String) -> Self {
        Self { worker, background, origin, sync_tag, tool_router: Self::tool_router() }
    }

    #[tool(description = "Run the worker install event: pre-warm the static cache from the precache manifest.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker, &self.background).await
    }

    #[tool(description = "Run the worker activate event: delete stale cache generations and claim clients.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker, &self.background).await
    }

    /// Route a request through the worker.
    ///
    /// GET http(s) requests are answered network-first, cache-first or
    /// stale-while-revalidate; failures fall back to the offline responder.
    #[tool(
        description = "Send a request through the worker. Returns the chosen strategy, the response and where it came from."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, &self.background, &self.origin, params.0).await
    }

    #[tool(description = "Post a page message to the worker (SKIP_WAITING or GET_CACHE_SIZE).")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, &self.background, params.0).await
    }

    #[tool(description = "Fire a background sync (by tag) or a reconnect (no tag) to drain pending form submissions.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, &self.background, params.0).await
    }

    #[tool(description = "Deliver a push message; returns the notification the worker would show.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, &self.background, params.0).await
    }

    #[tool(description = "Click a worker notification, optionally on an action button.")]
    async fn worker_notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, &self.background, params.0).await
    }

    #[tool(description = "Queue a contact-form submission that failed to send for background delivery.")]
    async fn form_enqueue(&self, params: Parameters<FormEnqueueParams>) -> Result<CallToolResult, McpError> {
        enqueue_impl(&self.worker, &self.sync_tag, params.0).await
    }

    #[tool(description = "Report lifecycle state, cache generations, cache size and pending submissions.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }
}

impl ServerHandler for FolioServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "folio-sw".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::worker;

    #[tokio::test]
    async fn test_lists_every_tool() {
        let server = FolioServer::new(worker(&[]).await, Background::default(), Url::parse("http://localhost:5173").unwrap(), "contact-form-sync".into());
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "form_enqueue",
                "worker_activate",
                "worker_fetch",
                "worker_install",
                "worker_message",
                "worker_notification_click",
                "worker_push",
                "worker_status",
                "worker_sync",
            ]
        );
    }
}
