//! Offline caching worker engine.
//!
//! This crate hosts everything a request-intercepting worker does between
//! the page and the network:
//!
//! - [`router`]: classifies GET requests into a fetch strategy
//! - [`strategy`]: network-first, cache-first and stale-while-revalidate
//! - [`fallback`]: last-resort offline responses
//! - [`lifecycle`]: install pre-warm, activate eviction, skip-waiting
//! - [`sync`]: the deferred contact-form submission queue
//! - [`worker`]: the single event dispatch that ties them together
//!
//! Collaborators (cache storage, submission store, fetcher, analytics sink)
//! are constructed once by [`registration::register`] and injected.

pub mod analytics;
pub mod fallback;
pub mod lifecycle;
pub mod messages;
pub mod notifications;
pub mod registration;
pub mod router;
pub mod strategy;
pub mod sync;
pub mod tasks;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use analytics::{EventSink, TracingSink};
pub use fallback::OfflineFallback;
pub use lifecycle::{ActivateReport, InstallReport, LifecycleManager, WorkerState};
pub use messages::{ClientMessage, WorkerMessage};
pub use notifications::{Notification, NotificationAction};
pub use registration::{Registration, register, register_with};
pub use router::{Matcher, Strategy, StrategyRouter, StrategyRule, should_intercept};
pub use strategy::{Served, Source, Strategies};
pub use sync::{DrainReport, SubmissionQueue};
pub use tasks::{Settled, WaitUntil};
pub use worker::{Effect, Event, Outcome, Reply, ServiceWorker, WorkerStatus};
