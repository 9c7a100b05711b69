//! Deferred contact-form delivery.
//!
//! Submissions that could not be sent live are parked in the `PortfolioDB`
//! store and replayed, oldest first, when a background sync or reconnect
//! fires. Each item is removed only after the endpoint accepts it.

use folio_client::Fetcher;
use folio_core::{Error, PendingSubmission, Request, SubmissionDb};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// Aggregate outcome of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Left in place because they reached the delivery attempt cap.
    pub skipped: usize,
}

pub struct SubmissionQueue {
    db: SubmissionDb,
    fetcher: Arc<dyn Fetcher>,
    endpoint: Url,
    max_attempts: Option<u32>,
    draining: Mutex<()>,
}

impl SubmissionQueue {
    pub fn new(db: SubmissionDb, fetcher: Arc<dyn Fetcher>, endpoint: Url, max_attempts: Option<u32>) -> Self {
        Self { db, fetcher, endpoint, max_attempts, draining: Mutex::new(()) }
    }

    pub fn db(&self) -> &SubmissionDb {
        &self.db
    }

    /// Durably store `payload` for later delivery.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a non-object payload and
    /// `Error::Queue` if the store write fails.
    pub async fn enqueue(&self, payload: Value) -> Result<i64, Error> {
        if !payload.is_object() {
            return Err(Error::InvalidInput("submission payload must be a JSON object".into()));
        }
        let id = self.db.add(&payload).await?;
        tracing::info!(id, "queued submission for background delivery");
        Ok(id)
    }

    /// Deliver every pending submission in insertion order.
    ///
    /// Never fails: a store read error ends the drain early and is logged,
    /// undecodable items are left out, and the report reflects whatever was
    /// attempted. Concurrent drains run one
    /// after the other.
    pub async fn drain(&self) -> DrainReport {
        let _guard = self.draining.lock().await;
        let mut report = DrainReport::default();

        let pending = match self.db.pending().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "could not read pending submissions");
                return report;
            }
        };

        for item in pending {
            if self.max_attempts.is_some_and(|cap| item.attempts >= cap) {
                tracing::debug!(id = item.id, attempts = item.attempts, "delivery attempt cap reached, skipping");
                report.skipped += 1;
                continue;
            }

            report.attempted += 1;
            match self.deliver(&item).await {
                Ok(()) => {
                    report.delivered += 1;
                    if let Err(e) = self.db.remove(item.id).await {
                        tracing::warn!(id = item.id, error = %e, "delivered submission could not be removed");
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::debug!(id = item.id, error = %e, "delivery failed, keeping submission");
                    if let Err(e) = self.db.record_failure(item.id, &e.to_string()).await {
                        tracing::warn!(id = item.id, error = %e, "could not record delivery failure");
                    }
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            "submission queue drained"
        );
        report
    }

    async fn deliver(&self, item: &PendingSubmission) -> Result<(), Error> {
        let request = Request::post_json(self.endpoint.clone(), &item.data)?;
        let response = self.fetcher.fetch(&request).await?;
        if !response.ok() {
            return Err(Error::HttpError(format!("{} returned {}", self.endpoint, response.status)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, ok, scratch_dir, tamper, url};
    use folio_core::Response;
    use serde_json::json;

    const ENDPOINT: &str = "http://localhost:5173/api/contact";

    async fn setup(max_attempts: Option<u32>) -> (SubmissionQueue, Arc<StubFetcher>) {
        let db = SubmissionDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(StubFetcher::new());
        (SubmissionQueue::new(db, fetcher.clone(), url(ENDPOINT), max_attempts), fetcher)
    }

    /// Endpoint double that accepts or rejects by the `name` field.
    struct Selective {
        rejects: &'static str,
        seen: std::sync::Mutex<Vec<Value>>,
    }

    #[async_trait::async_trait]
    impl Fetcher for Selective {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            let body: Value = serde_json::from_slice(request.body.as_deref().unwrap_or_default()).unwrap();
            assert_eq!(request.method, "POST");
            assert_eq!(request.header("content-type"), Some("application/json"));
            self.seen.lock().unwrap().push(body.clone());
            if body["name"] == self.rejects {
                Err(Error::Network("connection reset".into()))
            } else {
                Ok(Response::new(200, "{}"))
            }
        }
    }

    #[tokio::test]
    async fn test_drain_removes_delivered_and_keeps_failed() {
        let db = SubmissionDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(Selective { rejects: "B", seen: Default::default() });
        let queue = SubmissionQueue::new(db, fetcher.clone(), url(ENDPOINT), None);

        for name in ["A", "B", "C"] {
            queue.enqueue(json!({"name": name, "message": "hi"})).await.unwrap();
        }

        let report = queue.drain().await;
        assert_eq!(report, DrainReport { attempted: 3, delivered: 2, failed: 1, skipped: 0 });
        let order: Vec<Value> = fetcher.seen.lock().unwrap().iter().map(|b| b["name"].clone()).collect();
        assert_eq!(order, vec![json!("A"), json!("B"), json!("C")]);

        let remaining = queue.db().pending().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].data["name"], "B");
        assert_eq!(remaining[0].attempts, 1);
        assert!(remaining[0].last_error.as_deref().unwrap().starts_with("NETWORK_ERROR"));

        fetcher.seen.lock().unwrap().clear();
        let second = queue.drain().await;
        assert_eq!(second.attempted, 1);
        assert_eq!(fetcher.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let (queue, fetcher) = setup(None).await;
        assert_eq!(queue.drain().await, DrainReport::default());
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_ok_status_is_a_failure() {
        let (queue, fetcher) = setup(None).await;
        fetcher.respond(ENDPOINT, Response::new(500, "down"));
        queue.enqueue(json!({"name": "A"})).await.unwrap();

        let report = queue.drain().await;
        assert_eq!(report.failed, 1);
        assert_eq!(queue.db().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_posts_payload_verbatim() {
        let (queue, fetcher) = setup(None).await;
        fetcher.respond(ENDPOINT, ok("{}"));
        let payload = json!({"name": "Ada", "email": "ada@example.com", "message": "Hello"});
        queue.enqueue(payload.clone()).await.unwrap();

        assert_eq!(queue.drain().await.delivered, 1);
        let bodies = fetcher.bodies(ENDPOINT);
        assert_eq!(serde_json::from_str::<Value>(&bodies[0]).unwrap(), payload);
        assert_eq!(queue.db().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attempt_cap_skips() {
        let (queue, fetcher) = setup(Some(2)).await;
        queue.enqueue(json!({"name": "A"})).await.unwrap();

        queue.drain().await;
        queue.drain().await;
        let third = queue.drain().await;
        assert_eq!(third, DrainReport { attempted: 0, delivered: 0, failed: 0, skipped: 1 });
        assert_eq!(fetcher.call_count(ENDPOINT), 2);
        assert_eq!(queue.db().count().await.unwrap(), 1);
    }

    async fn on_disk(label: &str) -> (SubmissionQueue, Arc<StubFetcher>, std::path::PathBuf) {
        let dir = scratch_dir(label);
        let db = SubmissionDb::open(dir.join("PortfolioDB.sqlite")).await.unwrap();
        let fetcher = Arc::new(StubFetcher::new());
        (SubmissionQueue::new(db, fetcher.clone(), url(ENDPOINT), None), fetcher, dir)
    }

    #[tokio::test]
    async fn test_undecodable_item_does_not_block_the_rest() {
        let (queue, fetcher, dir) = on_disk("drain-corrupt").await;
        fetcher.respond(ENDPOINT, ok("{}"));
        let a = queue.enqueue(json!({"name": "A"})).await.unwrap();
        queue.enqueue(json!({"name": "B"})).await.unwrap();
        assert_eq!(a, 1);

        tamper(&dir.join("PortfolioDB.sqlite"), "UPDATE pending_forms SET data = '{not json' WHERE id = 1").await;

        let report = queue.drain().await;
        assert_eq!(report.delivered, 1);
        let bodies = fetcher.bodies(ENDPOINT);
        assert_eq!(serde_json::from_str::<Value>(&bodies[0]).unwrap(), json!({"name": "B"}));
        assert_eq!(queue.db().count().await.unwrap(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_enqueue_propagates_store_failure() {
        let (queue, _fetcher, dir) = on_disk("enqueue-fail").await;
        tamper(&dir.join("PortfolioDB.sqlite"), "DROP TABLE pending_forms").await;

        assert!(matches!(queue.enqueue(json!({"name": "A"})).await, Err(Error::Queue(_))));
        assert_eq!(queue.drain().await, DrainReport::default());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_enqueue_rejects_non_object() {
        let (queue, _fetcher) = setup(None).await;
        assert!(matches!(queue.enqueue(json!("just text")).await, Err(Error::InvalidInput(_))));
    }
}
