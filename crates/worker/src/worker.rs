//! Event dispatch.
//!
//! [`ServiceWorker::handle`] is the single entry point the host drives. Each
//! event yields an [`Outcome`]: an optional reply for the caller, effects the
//! host must carry out on the worker's behalf (claiming clients, showing a
//! notification), and a [`WaitUntil`] set of tasks the host keeps alive.

use crate::analytics::{self, EventSink};
use crate::fallback::OfflineFallback;
use crate::lifecycle::{ActivateReport, InstallReport, LifecycleManager, WorkerState};
use crate::messages::{ClientMessage, WorkerMessage};
use crate::notifications::{self, Notification};
use crate::router::{Strategy, StrategyRouter, should_intercept};
use crate::strategy::{Served, Strategies};
use crate::sync::{DrainReport, SubmissionQueue};
use crate::tasks::WaitUntil;
use folio_client::Fetcher;
use folio_core::{AppConfig, CacheDb, Error, Request, SubmissionDb};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

/// Something the host asks the worker to handle.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    /// A page request. Handled in every lifecycle state, so a host can
    /// replay requests against the caches before the worker takes control.
    Fetch(Request),
    /// A message posted by a page.
    Message(Value),
    Sync { tag: String },
    /// Connectivity came back.
    Online,
    Push { payload: Option<String> },
    NotificationClick { action: Option<String> },
}

/// Direct answer to an event.
#[derive(Debug, Clone)]
pub enum Reply {
    Fetch { strategy: Strategy, served: Served },
    Message(WorkerMessage),
    Installed { report: InstallReport, activated: Option<ActivateReport> },
    Activated(ActivateReport),
    Synced(DrainReport),
}

/// Work the host performs on the worker's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Take control of every open page without waiting for a reload.
    ClaimClients,
    ShowNotification { notification: Notification },
    CloseNotification,
    /// Open or focus a window at `url`.
    OpenWindow { url: String },
}

/// Result of handling one event.
#[derive(Debug, Default)]
pub struct Outcome {
    pub reply: Option<Reply>,
    pub effects: Vec<Effect>,
    pub wait_until: WaitUntil,
}

impl Outcome {
    fn reply(reply: Reply) -> Self {
        Self { reply: Some(reply), ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub static_cache: String,
    pub dynamic_cache: String,
    pub cache_names: Vec<String>,
    pub cache_size: u64,
    pub pending_submissions: u64,
}

pub struct ServiceWorker {
    router: StrategyRouter,
    strategies: Strategies,
    fallback: OfflineFallback,
    lifecycle: LifecycleManager,
    queue: SubmissionQueue,
    analytics: Arc<dyn EventSink>,
    sync_tag: String,
    skip_waiting_on_install: bool,
    notification_title: String,
    root: Url,
}

impl ServiceWorker {
    /// Wire the worker from configuration and its injected collaborators.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin, a manifest path or the
    /// contact endpoint does not resolve.
    pub fn new(
        config: &AppConfig,
        caches: CacheDb,
        submissions: SubmissionDb,
        fetcher: Arc<dyn Fetcher>,
        analytics: Arc<dyn EventSink>,
    ) -> Result<Self, Error> {
        let resolve = |path: &str| config.resolve(path).map_err(|e| Error::InvalidUrl(e.to_string()));

        let root = resolve("/")?;
        let manifest = config.precache_manifest.iter().map(|p| resolve(p)).collect::<Result<Vec<_>, _>>()?;
        let endpoint = resolve(&config.contact_endpoint)?;
        let generations = config.generations();

        Ok(Self {
            router: StrategyRouter::from_config(config),
            strategies: Strategies::new(caches.clone(), fetcher.clone(), generations.clone()),
            fallback: OfflineFallback::new(caches.clone(), generations.clone(), root.clone()),
            lifecycle: LifecycleManager::new(caches, fetcher.clone(), generations, manifest),
            queue: SubmissionQueue::new(submissions, fetcher, endpoint, config.max_delivery_attempts),
            analytics,
            sync_tag: config.sync_tag.clone(),
            skip_waiting_on_install: config.skip_waiting_on_install,
            notification_title: config.notification_title.clone(),
            root,
        })
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn router(&self) -> &StrategyRouter {
        &self.router
    }

    pub fn queue(&self) -> &SubmissionQueue {
        &self.queue
    }

    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Install and activate failures, undecodable messages, and cache
    /// storage failures while sizing caches. Fetch, sync and notification
    /// events never fail.
    pub async fn handle(&self, event: Event) -> Result<Outcome, Error> {
        match event {
            Event::Install => self.on_install().await,
            Event::Activate => self.on_activate().await,
            Event::Fetch(request) => Ok(self.on_fetch(request).await),
            Event::Message(message) => self.on_message(message).await,
            Event::Sync { tag } => Ok(self.on_sync(&tag).await),
            Event::Online => Ok(Outcome::reply(Reply::Synced(self.drain("online").await))),
            Event::Push { payload } => Ok(self.on_push(payload.as_deref())),
            Event::NotificationClick { action } => Ok(self.on_notification_click(action.as_deref())),
        }
    }

    async fn on_install(&self) -> Result<Outcome, Error> {
        let report = self.lifecycle.install(self.skip_waiting_on_install).await?;
        if !self.lifecycle.skip_waiting_requested() {
            return Ok(Outcome::reply(Reply::Installed { report, activated: None }));
        }

        let (activated, effects) = self.activate().await?;
        Ok(Outcome { reply: Some(Reply::Installed { report, activated: Some(activated) }), effects, ..Default::default() })
    }

    async fn on_activate(&self) -> Result<Outcome, Error> {
        let (report, effects) = self.activate().await?;
        Ok(Outcome { reply: Some(Reply::Activated(report)), effects, ..Default::default() })
    }

    async fn activate(&self) -> Result<(ActivateReport, Vec<Effect>), Error> {
        let report = self.lifecycle.activate().await?;
        self.analytics.track(analytics::SW_UPDATED, json!({ "deleted": &report.deleted }));
        Ok((report, vec![Effect::ClaimClients]))
    }

    async fn on_fetch(&self, request: Request) -> Outcome {
        if !should_intercept(&request) {
            tracing::debug!(method = %request.method, url = %request.url, "passing request through");
            return Outcome::default();
        }

        let strategy = self.router.classify(&request.url);
        let mut wait_until = WaitUntil::new();
        let served = match self.strategies.run(strategy, &request, &mut wait_until).await {
            Ok(served) => served,
            Err(e) => {
                tracing::debug!(url = %request.url, %strategy, error = %e, "strategy failed, using offline fallback");
                self.fallback.respond(&request).await
            }
        };

        tracing::debug!(url = %request.url, %strategy, source = ?served.source, status = served.response.status, "served");
        Outcome { reply: Some(Reply::Fetch { strategy, served }), effects: Vec::new(), wait_until }
    }

    async fn on_message(&self, message: Value) -> Result<Outcome, Error> {
        match ClientMessage::parse(message)? {
            ClientMessage::SkipWaiting => {
                if !self.lifecycle.skip_waiting() {
                    return Ok(Outcome::default());
                }
                self.on_activate().await
            }
            ClientMessage::GetCacheSize => {
                let size = self.strategies.caches().total_size().await?;
                Ok(Outcome::reply(Reply::Message(WorkerMessage::CacheSize { size })))
            }
        }
    }

    async fn on_sync(&self, tag: &str) -> Outcome {
        if tag != self.sync_tag {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return Outcome::default();
        }
        Outcome::reply(Reply::Synced(self.drain(tag).await))
    }

    async fn drain(&self, trigger: &str) -> DrainReport {
        let report = self.queue.drain().await;
        self.analytics.track(
            analytics::BACKGROUND_SYNC,
            json!({ "trigger": trigger, "delivered": report.delivered, "failed": report.failed }),
        );
        report
    }

    fn on_push(&self, payload: Option<&str>) -> Outcome {
        let notification = Notification::from_push(&self.notification_title, payload);
        Outcome { effects: vec![Effect::ShowNotification { notification }], ..Default::default() }
    }

    fn on_notification_click(&self, action: Option<&str>) -> Outcome {
        let mut effects = vec![Effect::CloseNotification];
        if action == Some(notifications::EXPLORE) {
            effects.push(Effect::OpenWindow { url: self.root.to_string() });
        }
        Outcome { effects, ..Default::default() }
    }

    /// Snapshot of lifecycle and storage state.
    ///
    /// # Errors
    ///
    /// Propagates cache or submission store failures.
    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        let caches = self.strategies.caches();
        let generations = self.strategies.generations();
        Ok(WorkerStatus {
            state: self.lifecycle.state(),
            skip_waiting: self.lifecycle.skip_waiting_requested(),
            static_cache: generations.static_name(),
            dynamic_cache: generations.dynamic_name(),
            cache_names: caches.cache_names().await?,
            cache_size: caches.total_size().await?,
            pending_submissions: self.queue.db().count().await?,
        })
    }
}
