//! worker_push and worker_notification_click.

use super::{Background, outcome_result};
use folio_worker::{Event, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Push payload text. Omit for a push without data.
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Action button clicked (`explore` or `close`); omit for a body click.
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn push_impl(
    worker: &ServiceWorker, background: &Background, params: WorkerPushParams,
) -> Result<CallToolResult, McpError> {
    outcome_result(worker.handle(Event::Push { payload: params.payload }).await?, background)
}

pub async fn click_impl(
    worker: &ServiceWorker, background: &Background, params: NotificationClickParams,
) -> Result<CallToolResult, McpError> {
    outcome_result(worker.handle(Event::NotificationClick { action: params.action }).await?, background)
}
