//! Page ↔ worker message protocol.

use folio_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages a page posts to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Activate a waiting worker now.
    SkipWaiting,
    /// Ask for the total cached body size.
    GetCacheSize,
}

/// Replies the worker posts back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    CacheSize { size: u64 },
}

impl ClientMessage {
    /// Decode a posted message.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for unknown types or malformed messages.
    pub fn parse(value: Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::InvalidInput(format!("message: {e}")))
    }
}
