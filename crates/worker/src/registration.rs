//! Worker registration.
//!
//! Opens the durable stores and the network client, builds the worker, and
//! reports the result to the analytics sink.

use crate::analytics::{ERROR, EventSink, SW_REGISTERED};
use crate::worker::ServiceWorker;
use folio_client::{FetchClient, FetchConfig, Fetcher};
use folio_core::{AppConfig, CacheDb, Error, SubmissionDb};
use serde_json::json;
use std::sync::Arc;
use url::Url;

/// A registered worker and the scope it controls.
pub struct Registration {
    pub scope: Url,
    pub worker: Arc<ServiceWorker>,
}

/// Register a worker using on-disk stores and a live HTTP client.
///
/// # Errors
///
/// Returns the first store, client or configuration error. The failure is
/// also reported as an `error` analytics event.
pub async fn register(config: &AppConfig, analytics: Arc<dyn EventSink>) -> Result<Registration, Error> {
    let result = async {
        let caches = CacheDb::open(&config.cache_db_path).await?;
        let submissions = SubmissionDb::open(&config.queue_db_path).await?;
        let fetcher: Arc<dyn Fetcher> = Arc::new(FetchClient::new(FetchConfig::from_app(config))?);
        Ok::<_, Error>((caches, submissions, fetcher))
    }
    .await;

    match result {
        Ok((caches, submissions, fetcher)) => register_with(config, caches, submissions, fetcher, analytics),
        Err(e) => {
            report_failure(analytics.as_ref(), &e);
            Err(e)
        }
    }
}

/// Register a worker around already opened collaborators.
///
/// # Errors
///
/// Returns `Error::InvalidUrl` when the scope or a configured path does not
/// resolve against the origin.
pub fn register_with(
    config: &AppConfig,
    caches: CacheDb,
    submissions: SubmissionDb,
    fetcher: Arc<dyn Fetcher>,
    analytics: Arc<dyn EventSink>,
) -> Result<Registration, Error> {
    let built = config
        .resolve(&config.scope)
        .map_err(|e| Error::InvalidUrl(e.to_string()))
        .and_then(|scope| Ok((scope, ServiceWorker::new(config, caches, submissions, fetcher, analytics.clone())?)));

    match built {
        Ok((scope, worker)) => {
            tracing::info!(scope = %scope, "worker registered");
            analytics.track(SW_REGISTERED, json!({ "scope": scope.as_str() }));
            Ok(Registration { scope, worker: Arc::new(worker) })
        }
        Err(e) => {
            report_failure(analytics.as_ref(), &e);
            Err(e)
        }
    }
}

fn report_failure(analytics: &dyn EventSink, error: &Error) {
    tracing::error!(error = %error, "worker registration failed");
    analytics.track(ERROR, json!({ "context": "sw_registration", "message": error.to_string() }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, StubFetcher};

    async fn stores() -> (CacheDb, SubmissionDb) {
        (CacheDb::open_in_memory().await.unwrap(), SubmissionDb::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_register_reports_scope() {
        let (caches, submissions) = stores().await;
        let sink = Arc::new(RecordingSink::default());
        let config = AppConfig::default();

        let registration =
            register_with(&config, caches, submissions, Arc::new(StubFetcher::new()), sink.clone()).unwrap();
        assert_eq!(registration.scope.as_str(), "http://localhost:5173/");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "sw_registered");
        assert_eq!(events[0].1["scope"], "http://localhost:5173/");
    }

    #[tokio::test]
    async fn test_register_failure_is_tracked() {
        let (caches, submissions) = stores().await;
        let sink = Arc::new(RecordingSink::default());
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };

        let result = register_with(&config, caches, submissions, Arc::new(StubFetcher::new()), sink.clone());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));

        let events = sink.events();
        assert_eq!(events[0].0, "error");
        assert_eq!(events[0].1["context"], "sw_registration");
    }

    #[tokio::test]
    async fn test_register_opens_stores_on_disk() {
        let dir = std::env::temp_dir().join(format!("folio-sw-register-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = AppConfig {
            cache_db_path: dir.join("cache.sqlite"),
            queue_db_path: dir.join("PortfolioDB.sqlite"),
            ..Default::default()
        };

        let registration = register(&config, Arc::new(RecordingSink::default())).await.unwrap();
        let status = registration.worker.status().await.unwrap();
        assert_eq!(status.pending_submissions, 0);
        assert!(config.cache_db_path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
