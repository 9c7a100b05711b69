//! worker_status tool implementation.

use super::json_result;
use folio_worker::ServiceWorker;
use rmcp::{ErrorData as McpError, model::CallToolResult};

pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    json_result(&worker.status().await?)
}
