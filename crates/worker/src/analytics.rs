//! Analytics event sink.
//!
//! The worker reports a handful of named events (registration, activation,
//! background sync). Where they go is the host's business.

use serde_json::Value;

pub const SW_REGISTERED: &str = "sw_registered";
pub const SW_UPDATED: &str = "sw_updated";
pub const BACKGROUND_SYNC: &str = "background_sync";
pub const ERROR: &str = "error";

/// Receives named analytics events with a JSON property bag.
pub trait EventSink: Send + Sync {
    fn track(&self, name: &str, properties: Value);
}

/// Emits every event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn track(&self, name: &str, properties: Value) {
        tracing::info!(target: "folio_sw::analytics", event = name, properties = %properties, "analytics event");
    }
}
