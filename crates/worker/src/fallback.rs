//! Last-resort responses when a strategy produced nothing.

use crate::strategy::{Served, Source, lookup};
use chrono::{SecondsFormat, Utc};
use folio_core::{CacheDb, GenerationSet, Request, Response};
use serde_json::json;
use url::Url;

pub const OFFLINE_ERROR: &str = "Offline";
pub const OFFLINE_MESSAGE: &str = "This content is not available offline.";

/// Offline responder.
///
/// Resolution order:
///
/// 1. exact match in the static generation
/// 2. for navigations, the cached application shell (`/`)
/// 3. a synthesized `503` JSON body
#[derive(Clone, Debug)]
pub struct OfflineFallback {
    caches: CacheDb,
    generations: GenerationSet,
    shell_url: Url,
}

impl OfflineFallback {
    pub fn new(caches: CacheDb, generations: GenerationSet, shell_url: Url) -> Self {
        Self { caches, generations, shell_url }
    }

    /// Always produces a response.
    pub async fn respond(&self, request: &Request) -> Served {
        let static_name = self.generations.static_name();
        if let Some(hit) = lookup(&self.caches, &static_name, request).await {
            return Served { response: hit, source: Source::Cache };
        }

        if request.is_navigation() {
            let shell = Request::get(self.shell_url.clone());
            for name in [static_name, self.generations.dynamic_name()] {
                if let Some(hit) = lookup(&self.caches, &name, &shell).await {
                    tracing::info!(url = %request.url, "serving cached shell for offline navigation");
                    return Served { response: hit, source: Source::Shell };
                }
            }
        }

        tracing::info!(url = %request.url, "no offline copy, returning 503");
        Served { response: offline_response(), source: Source::Offline }
    }
}

/// The synthesized `503 Service Unavailable` body.
pub fn offline_response() -> Response {
    let body = json!({
        "error": OFFLINE_ERROR,
        "message": OFFLINE_MESSAGE,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    });
    Response::json(503, "Service Unavailable", &body)
}
