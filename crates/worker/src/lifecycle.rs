//! Worker lifecycle: install, activate, skip-waiting.
//!
//! ```text
//! parsed ──install──▶ installing ──ok──▶ waiting ──activate──▶ activating ──▶ active
//!                         │
//!                         └──fail──▶ redundant
//! ```
//!
//! Install is all-or-nothing: every manifest URL is fetched before anything
//! is written, and a single failure leaves the static generation untouched.

use folio_client::Fetcher;
use folio_core::{CacheDb, Error, GenerationSet, Request};
use futures_util::future::try_join_all;
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Waiting,
    Activating,
    Active,
    Redundant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct InstallReport {
    pub cache: String,
    pub precached: usize,
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
}

pub struct LifecycleManager {
    caches: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    generations: GenerationSet,
    manifest: Vec<Url>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
}

impl LifecycleManager {
    pub fn new(caches: CacheDb, fetcher: Arc<dyn Fetcher>, generations: GenerationSet, manifest: Vec<Url>) -> Self {
        Self {
            caches,
            fetcher,
            generations,
            manifest,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state != next {
            tracing::info!(from = ?*state, to = ?next, "worker state changed");
            *state = next;
        }
    }

    /// Whether skip-waiting has been requested.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> &GenerationSet {
        &self.generations
    }

    /// Pre-warm the static generation from the manifest.
    ///
    /// `skip_waiting` records the worker's eagerness to replace a running
    /// predecessor; it is honored once install succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any manifest fetch fails or returns
    /// a non-ok status, or the batch write fails. The worker becomes
    /// redundant and the static generation is left as it was.
    pub async fn install(&self, skip_waiting: bool) -> Result<InstallReport, Error> {
        match self.state() {
            WorkerState::Parsed | WorkerState::Redundant => {}
            state => return Err(Error::InvalidInput(format!("cannot install from state {state:?}"))),
        }
        self.set_state(WorkerState::Installing);
        if skip_waiting {
            self.skip_waiting.store(true, Ordering::SeqCst);
        }

        match self.precache().await {
            Ok(precached) => {
                self.set_state(WorkerState::Waiting);
                tracing::info!(cache = %self.generations.static_name(), precached, "install complete");
                Ok(InstallReport { cache: self.generations.static_name(), precached, skip_waiting: self.skip_waiting_requested() })
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                tracing::error!(error = %e, "install failed");
                Err(Error::InstallFailed(e.to_string()))
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let fetches = self.manifest.iter().map(|url| {
            let request = Request::get(url.clone());
            let fetcher = self.fetcher.clone();
            async move {
                let response = fetcher.fetch(&request).await?;
                if !response.ok() {
                    return Err(Error::HttpError(format!("{} returned {}", request.url, response.status)));
                }
                Ok((request, response))
            }
        });
        let entries = try_join_all(fetches).await?;

        let cache = self.caches.open_cache(&self.generations.static_name()).await?;
        cache.put_all(&entries).await?;
        Ok(entries.len())
    }

    /// Delete every generation that is not current and take control.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` unless the worker is waiting (or already
    /// active), and propagates cache storage failures. A failed activation
    /// returns the worker to the state it started from, so it can be retried.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = match self.state() {
            state @ (WorkerState::Waiting | WorkerState::Active) => state,
            state => return Err(Error::InvalidInput(format!("cannot activate from state {state:?}"))),
        };
        self.set_state(WorkerState::Activating);

        match self.evict_stale().await {
            Ok(report) => {
                self.set_state(WorkerState::Active);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "activation failed");
                self.set_state(previous);
                Err(e)
            }
        }
    }

    async fn evict_stale(&self) -> Result<ActivateReport, Error> {
        let mut report = ActivateReport::default();
        for name in self.caches.cache_names().await? {
            if self.generations.is_current(&name) {
                report.kept.push(name);
            } else if self.caches.delete_cache(&name).await? {
                tracing::info!(cache = %name, "deleted stale cache generation");
                report.deleted.push(name);
            }
        }
        Ok(report)
    }

    /// Mark skip-waiting. Returns `true` if the worker is waiting and should
    /// activate now.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.state() == WorkerState::Waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, ok, scratch_dir, tamper, url};
    use folio_core::Response;

    const ORIGIN: &str = "http://localhost:5173";

    fn manifest() -> Vec<Url> {
        ["/", "/index.html", "/src/assets/logo.png"].iter().map(|p| url(&format!("{ORIGIN}{p}"))).collect()
    }

    async fn setup() -> (LifecycleManager, CacheDb, Arc<StubFetcher>) {
        let caches = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(StubFetcher::new());
        let manager = LifecycleManager::new(caches.clone(), fetcher.clone(), GenerationSet::for_version("v1"), manifest());
        (manager, caches, fetcher)
    }

    fn serve_manifest(fetcher: &StubFetcher) {
        for u in manifest() {
            fetcher.respond(u.as_str(), ok(u.path()));
        }
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let (manager, caches, fetcher) = setup().await;
        serve_manifest(&fetcher);

        let report = manager.install(true).await.unwrap();
        assert_eq!(report.cache, "static-v1");
        assert_eq!(report.precached, 3);
        assert!(report.skip_waiting);
        assert_eq!(manager.state(), WorkerState::Waiting);

        let cache = caches.open_cache("static-v1").await.unwrap();
        assert_eq!(cache.keys().await.unwrap().len(), 3);
        let hit = cache.match_request(&Request::get(url(&format!("{ORIGIN}/index.html")))).await.unwrap();
        assert_eq!(hit.unwrap().text(), "/index.html");
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let (manager, caches, fetcher) = setup().await;
        serve_manifest(&fetcher);
        fetcher.offline(&format!("{ORIGIN}/src/assets/logo.png"));

        let err = manager.install(false).await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed(_)));
        assert_eq!(manager.state(), WorkerState::Redundant);

        let cache = caches.open_cache("static-v1").await.unwrap();
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_rejects_non_ok() {
        let (manager, caches, fetcher) = setup().await;
        serve_manifest(&fetcher);
        fetcher.respond(&format!("{ORIGIN}/index.html"), Response::new(404, "missing"));

        assert!(manager.install(false).await.is_err());
        assert_eq!(caches.open_cache("static-v1").await.unwrap().size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let (manager, _caches, fetcher) = setup().await;
        serve_manifest(&fetcher);
        manager.install(false).await.unwrap();
        assert!(matches!(manager.install(false).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_activate_evicts_stale_generations() {
        let (manager, caches, fetcher) = setup().await;
        serve_manifest(&fetcher);
        caches.open_cache("dynamic-v1").await.unwrap();
        caches.open_cache("static-v0-orphan").await.unwrap();
        manager.install(false).await.unwrap();

        let report = manager.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["static-v0-orphan".to_string()]);
        assert_eq!(manager.state(), WorkerState::Active);

        let mut names = caches.cache_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["dynamic-v1".to_string(), "static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_activation_can_be_retried() {
        let dir = scratch_dir("activate");
        let path = dir.join("cache.sqlite");
        let caches = CacheDb::open(&path).await.unwrap();
        let fetcher = Arc::new(StubFetcher::new());
        let manager = LifecycleManager::new(caches, fetcher.clone(), GenerationSet::for_version("v1"), manifest());
        serve_manifest(&fetcher);
        manager.install(false).await.unwrap();

        tamper(&path, "ALTER TABLE cache_generations RENAME TO cache_generations_moved").await;
        assert!(matches!(manager.activate().await, Err(Error::Database(_))));
        assert_eq!(manager.state(), WorkerState::Waiting);
        assert!(manager.skip_waiting());

        tamper(&path, "ALTER TABLE cache_generations_moved RENAME TO cache_generations").await;
        let report = manager.activate().await.unwrap();
        assert_eq!(report.kept, vec!["static-v1".to_string()]);
        assert_eq!(manager.state(), WorkerState::Active);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (manager, _caches, _fetcher) = setup().await;
        assert!(manager.activate().await.is_err());
        assert_eq!(manager.state(), WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_skip_waiting_only_signals_when_waiting() {
        let (manager, _caches, fetcher) = setup().await;
        assert!(!manager.skip_waiting());

        serve_manifest(&fetcher);
        manager.install(false).await.unwrap();
        assert!(manager.skip_waiting());
        assert!(manager.skip_waiting_requested());

        manager.activate().await.unwrap();
        assert!(!manager.skip_waiting());
    }

    #[tokio::test]
    async fn test_reinstall_after_failure() {
        let (manager, _caches, fetcher) = setup().await;
        assert!(manager.install(false).await.is_err());

        serve_manifest(&fetcher);
        assert!(manager.install(false).await.is_ok());
        assert_eq!(manager.state(), WorkerState::Waiting);
    }
}
