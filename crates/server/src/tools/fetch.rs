//! worker_fetch tool implementation.
//!
//! Replays a page request through the worker's routing and strategies.

use super::{Background, outcome_result};
use folio_client::canonicalize_against;
use folio_core::{Destination, Error, Request};
use folio_worker::{Event, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute http(s) URL, or a root-relative path resolved against the
    /// configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination; `document` marks a full-page navigation.
    #[serde(default)]
    pub destination: Destination,

    /// Optional JSON body for non-GET requests.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

fn default_method() -> String {
    "GET".into()
}

fn build_request(origin: &Url, params: &WorkerFetchParams) -> Result<Request, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }
    let url = canonicalize_against(origin, &params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;

    let request = match &params.body {
        Some(body) => {
            let mut request = Request::post_json(url, body)?;
            request.method = params.method.to_ascii_uppercase();
            request
        }
        None => Request::with_method(url, &params.method),
    };
    Ok(request.with_destination(params.destination))
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(
    worker: &ServiceWorker, background: &Background, origin: &Url, params: WorkerFetchParams,
) -> Result<CallToolResult, McpError> {
    let request = build_request(origin, &params)?;
    outcome_result(worker.handle(Event::Fetch(request)).await?, background)
}
