//! MCP tool implementations.
//!
//! Each tool turns its parameters into a worker [`Event`], hands it to the
//! worker and renders the [`Outcome`] as pretty JSON. Keep-alive tasks from
//! the outcome are handed to [`Background`] before the tool returns; the
//! binary drains it at shutdown.
//!
//! [`Event`]: folio_worker::Event

pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod status;
pub mod sync;

use folio_core::{Error, Response};
use folio_worker::{Effect, Outcome, Reply, Served, Settled, Source, Strategy, WaitUntil};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;

/// A served response as shown to the MCP client.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ServedOutput {
    pub strategy: Strategy,
    pub source: Source,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body as UTF-8 text (lossy).
    pub body: String,
    pub body_bytes: usize,
}

impl ServedOutput {
    fn new(strategy: Strategy, served: &Served) -> Self {
        let Response { status, status_text, headers, .. } = &served.response;
        Self {
            strategy,
            source: served.source,
            status: *status,
            status_text: status_text.clone(),
            headers: headers.clone(),
            body: served.response.text(),
            body_bytes: served.response.body_len(),
        }
    }
}

/// Rendered outcome of one worker event.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct OutcomeOutput {
    /// `null` when the worker had nothing to say (e.g. a pass-through fetch).
    pub reply: Option<Value>,
    pub effects: Vec<Effect>,
    /// Background tasks still running after the reply.
    pub background_tasks: usize,
}

fn reply_value(reply: &Reply) -> Result<Value, serde_json::Error> {
    match reply {
        Reply::Fetch { strategy, served } => serde_json::to_value(ServedOutput::new(*strategy, served)),
        Reply::Message(message) => serde_json::to_value(message),
        Reply::Installed { report, activated } => {
            Ok(serde_json::json!({ "installed": report, "activated": activated }))
        }
        Reply::Activated(report) => Ok(serde_json::json!({ "activated": report })),
        Reply::Synced(report) => Ok(serde_json::json!({ "synced": report })),
    }
}

/// Keep-alive tasks still running after their tool replied.
#[derive(Clone, Default)]
pub struct Background {
    tasks: Arc<Mutex<JoinSet<Settled>>>,
}

impl Background {
    /// Run `wait_until` to completion in the background. Returns how many
    /// tasks it carried.
    pub fn keep(&self, wait_until: WaitUntil) -> usize {
        let count = wait_until.len();
        if count > 0 {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            while tasks.try_join_next().is_some() {}
            tasks.spawn(wait_until.settle());
        }
        count
    }

    /// Wait for every task handed over so far.
    pub async fn drain(&self) -> Settled {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };

        let mut total = Settled::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(settled) => {
                    total.completed += settled.completed;
                    total.failed += settled.failed;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "background task set aborted");
                    total.failed += 1;
                }
            }
        }
        total
    }
}

pub(crate) fn render(outcome: Outcome, background: &Background) -> Result<OutcomeOutput, McpError> {
    let reply = outcome
        .reply
        .as_ref()
        .map(reply_value)
        .transpose()
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize reply: {e}")))?;
    let background_tasks = background.keep(outcome.wait_until);
    Ok(OutcomeOutput { reply, effects: outcome.effects, background_tasks })
}

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub(crate) fn outcome_result(outcome: Outcome, background: &Background) -> Result<CallToolResult, McpError> {
    json_result(&render(outcome, background)?)
}
