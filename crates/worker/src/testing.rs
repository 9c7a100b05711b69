//! Test doubles shared by the worker's unit tests.

use crate::analytics::EventSink;
use async_trait::async_trait;
use folio_client::Fetcher;
use folio_core::{Error, Request, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_rusqlite::rusqlite;

/// What the stub does for a given URL.
#[derive(Debug, Clone)]
pub enum Route {
    Respond(Response),
    Offline,
    Timeout,
}

/// Scripted [`Fetcher`]: per-URL responses, optional latency, call log.
///
/// Unknown URLs behave as if the network were unreachable.
#[derive(Debug, Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, (Route, Duration)>>,
    calls: Mutex<Vec<(String, String, Option<String>)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.route(url, Route::Respond(response), Duration::ZERO);
    }

    pub fn respond_after(&self, url: &str, response: Response, delay: Duration) {
        self.route(url, Route::Respond(response), delay);
    }

    pub fn offline(&self, url: &str) {
        self.route(url, Route::Offline, Duration::ZERO);
    }

    pub fn route(&self, url: &str, route: Route, delay: Duration) {
        self.routes.lock().unwrap().insert(url.to_string(), (route, delay));
    }

    /// `(method, url)` of every request seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().iter().map(|(m, u, _)| (m.clone(), u.clone())).collect()
    }

    /// Request bodies of every call to `url`, as UTF-8.
    pub fn bodies(&self, url: &str) -> Vec<String> {
        self.calls.lock().unwrap().iter().filter(|(_, u, _)| u == url).filter_map(|(_, _, b)| b.clone()).collect()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, u, _)| u == url).count()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        let body = request.body.as_ref().map(|b| String::from_utf8_lossy(b).to_string());
        self.calls.lock().unwrap().push((request.method.clone(), url.clone(), body));

        let route = self.routes.lock().unwrap().get(&url).cloned();
        let (route, delay) = route.unwrap_or((Route::Offline, Duration::ZERO));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match route {
            Route::Respond(response) => Ok(response),
            Route::Offline => Err(Error::Network(format!("offline: {url}"))),
            Route::Timeout => Err(Error::FetchTimeout(format!("timed out: {url}"))),
        }
    }
}

/// Records every analytics event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }
}

impl EventSink for RecordingSink {
    fn track(&self, name: &str, properties: Value) {
        self.events.lock().unwrap().push((name.to_string(), properties));
    }
}

pub fn ok(body: &str) -> Response {
    Response::new(200, body.to_string()).with_status_text("OK")
}

pub fn url(s: &str) -> url::Url {
    url::Url::parse(s).unwrap()
}

/// Fresh scratch directory for tests that need on-disk stores.
pub fn scratch_dir(label: &str) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let n = NEXT.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("folio-sw-{label}-{}-{n}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Run raw SQL against an on-disk store through a second connection.
pub async fn tamper(path: &Path, sql: &'static str) {
    let conn = tokio_rusqlite::Connection::open(path).await.unwrap();
    conn.call(move |conn| -> rusqlite::Result<()> { conn.execute_batch(sql) }).await.unwrap();
}
