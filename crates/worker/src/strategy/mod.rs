//! Fetch strategies.
//!
//! Each strategy resolves a GET request to a served response, or to the
//! network error that left it with nothing to serve. Network-first reads and
//! writes the dynamic generation; cache-first and stale-while-revalidate use
//! the static one. Only `ok` network responses are ever written.
//!
//! Cache read failures count as misses and write failures are logged. Work
//! that must outlive the reply is registered in a [`WaitUntil`].

mod cache_first;
mod network_first;
mod stale_while_revalidate;

use crate::router::Strategy;
use crate::tasks::WaitUntil;
use folio_client::Fetcher;
use folio_core::{CacheDb, Error, GenerationSet, Request, Response, Role};
use serde::Serialize;
use std::sync::Arc;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Network,
    Cache,
    /// The cached application shell served for an offline navigation.
    Shell,
    /// The synthesized 503 offline response.
    Offline,
}

/// A response handed back to the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    pub fn network(response: Response) -> Self {
        Self { response, source: Source::Network }
    }

    pub fn cache(response: Response) -> Self {
        Self { response, source: Source::Cache }
    }
}

/// Shared collaborators for every strategy.
#[derive(Clone)]
pub struct Strategies {
    caches: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    generations: GenerationSet,
}

impl Strategies {
    pub fn new(caches: CacheDb, fetcher: Arc<dyn Fetcher>, generations: GenerationSet) -> Self {
        Self { caches, fetcher, generations }
    }

    /// Run `strategy` for `request`.
    ///
    /// # Errors
    ///
    /// Returns the network error when neither the network nor the cache
    /// produced a response. Callers fall back to the offline responder.
    pub async fn run(&self, strategy: Strategy, request: &Request, wait_until: &mut WaitUntil) -> Result<Served, Error> {
        match strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request, wait_until).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, wait_until).await,
        }
    }

    /// Look `request` up in the current generation for `role`.
    pub(crate) async fn lookup(&self, role: Role, request: &Request) -> Option<Response> {
        lookup(&self.caches, &self.generations.name_for(role), request).await
    }

    pub(crate) async fn store(&self, role: Role, request: &Request, response: &Response) {
        store(&self.caches, &self.generations.name_for(role), request, response).await;
    }

    pub(crate) fn fetcher(&self) -> Arc<dyn Fetcher> {
        self.fetcher.clone()
    }

    pub fn caches(&self) -> &CacheDb {
        &self.caches
    }

    pub fn generations(&self) -> &GenerationSet {
        &self.generations
    }
}

pub(crate) async fn lookup(caches: &CacheDb, name: &str, request: &Request) -> Option<Response> {
    let result = match caches.open_cache(name).await {
        Ok(cache) => cache.match_request(request).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(cache = name, url = %request.url, error = %e, "cache lookup failed, treating as miss");
            None
        }
    }
}

/// Write `response` if it is `ok`; failures are logged and swallowed.
pub(crate) async fn store(caches: &CacheDb, name: &str, request: &Request, response: &Response) {
    if !response.ok() {
        tracing::debug!(url = %request.url, status = response.status, "not caching non-ok response");
        return;
    }
    let result = match caches.open_cache(name).await {
        Ok(cache) => cache.put(request, response).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!(cache = name, url = %request.url, error = %e, "cache write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, ok, url};

    #[tokio::test]
    async fn test_store_skips_non_ok() {
        let caches = CacheDb::open_in_memory().await.unwrap();
        let request = Request::get(url("http://localhost:5173/missing"));

        store(&caches, "dynamic-v1", &request, &Response::new(404, "nope")).await;
        assert!(lookup(&caches, "dynamic-v1", &request).await.is_none());

        store(&caches, "dynamic-v1", &request, &ok("yes")).await;
        assert_eq!(lookup(&caches, "dynamic-v1", &request).await.unwrap().text(), "yes");
    }

    #[tokio::test]
    async fn test_roles_are_separate_generations() {
        let caches = CacheDb::open_in_memory().await.unwrap();
        let strategies = Strategies::new(caches, Arc::new(StubFetcher::new()), GenerationSet::for_version("v1"));
        let request = Request::get(url("http://localhost:5173/"));

        strategies.store(Role::Dynamic, &request, &ok("dynamic")).await;
        assert!(strategies.lookup(Role::Static, &request).await.is_none());
        assert_eq!(strategies.lookup(Role::Dynamic, &request).await.unwrap().text(), "dynamic");
        assert!(strategies.caches().has_cache("dynamic-v1").await.unwrap());
    }
}
