//! worker_sync and form_enqueue.

use super::{Background, json_result, outcome_result};
use folio_core::Error;
use folio_worker::{Event, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Background sync tag. Omit to simulate a reconnect.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Parameters for the form_enqueue tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FormEnqueueParams {
    /// Form fields as a JSON object.
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FormEnqueueOutput {
    pub id: i64,
    /// Tag to register so the submission is retried.
    pub sync_tag: String,
}

pub async fn sync_impl(
    worker: &ServiceWorker, background: &Background, params: WorkerSyncParams,
) -> Result<CallToolResult, McpError> {
    let event = match params.tag {
        Some(tag) if tag.trim().is_empty() => return Err(Error::InvalidInput("tag cannot be empty".into()).into()),
        Some(tag) => Event::Sync { tag },
        None => Event::Online,
    };
    outcome_result(worker.handle(event).await?, background)
}

pub async fn enqueue_impl(
    worker: &ServiceWorker, sync_tag: &str, params: FormEnqueueParams,
) -> Result<CallToolResult, McpError> {
    let id = worker.queue().enqueue(params.payload).await?;
    json_result(&FormEnqueueOutput { id, sync_tag: sync_tag.to_string() })
}
