//! worker_install, worker_activate and worker_message.

use super::{Background, outcome_result};
use folio_worker::{Event, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// Message posted by a page, e.g. `{"type": "SKIP_WAITING"}` or
    /// `{"type": "GET_CACHE_SIZE"}`.
    pub message: Value,
}

pub async fn install_impl(worker: &ServiceWorker, background: &Background) -> Result<CallToolResult, McpError> {
    outcome_result(worker.handle(Event::Install).await?, background)
}

pub async fn activate_impl(worker: &ServiceWorker, background: &Background) -> Result<CallToolResult, McpError> {
    outcome_result(worker.handle(Event::Activate).await?, background)
}

pub async fn message_impl(
    worker: &ServiceWorker, background: &Background, params: WorkerMessageParams,
) -> Result<CallToolResult, McpError> {
    outcome_result(worker.handle(Event::Message(params.message)).await?, background)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, worker};
    use serde_json::json;

    #[tokio::test]
    async fn test_install_then_cache_size() {
        let worker = worker(&[("http://localhost:5173/", 200, "<html></html>")]).await;

        let installed = output(&install_impl(&worker, &Background::default()).await.unwrap());
        assert_eq!(installed["reply"]["installed"]["precached"], 1);
        assert_eq!(installed["effects"][0]["type"], "claim_clients");

        let params = WorkerMessageParams { message: json!({"type": "GET_CACHE_SIZE"}) };
        let size = output(&message_impl(&worker, &Background::default(), params).await.unwrap());
        assert_eq!(size["reply"], json!({"type": "CACHE_SIZE", "size": 13}));
    }

    #[tokio::test]
    async fn test_install_failure_is_tool_error() {
        let worker = worker(&[]).await;
        let err = install_impl(&worker, &Background::default()).await.unwrap_err();
        assert_eq!(err.code.0, -32009);
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let worker = worker(&[]).await;
        assert!(activate_impl(&worker, &Background::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_message_is_invalid_params() {
        let worker = worker(&[]).await;
        let err = message_impl(&worker, &Background::default(), WorkerMessageParams { message: json!({"type": "NOPE"}) }).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
