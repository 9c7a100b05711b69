//! Request and response snapshots.
//!
//! These are the values that flow between the worker, the transport and the
//! cache storage. A `Response` is fully buffered so it can be handed to the
//! caller and written to a cache without stream tee-ing.

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// What the requesting context intends to do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Sub-resource fetch with no specific destination (XHR, fetch()).
    #[default]
    Empty,
    /// Full-page navigation.
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
}

/// An outbound request as seen by the worker.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, stored upper-case.
    pub method: String,
    pub url: Url,
    pub destination: Destination,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl Request {
    /// A plain GET sub-resource request.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, destination: Destination::Empty, headers: Vec::new(), body: None }
    }

    /// A full-page navigation request.
    pub fn navigate(url: Url) -> Self {
        Self::get(url).with_destination(Destination::Document)
    }

    /// A POST carrying a JSON body with the matching content type.
    pub fn post_json(url: Url, payload: &serde_json::Value) -> Result<Self, Error> {
        let body = serde_json::to_vec(payload).map_err(|e| Error::InvalidInput(format!("payload: {e}")))?;
        Ok(Self {
            method: "POST".into(),
            url,
            destination: Destination::Empty,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Some(Bytes::from(body)),
        })
    }

    /// Build a request with an arbitrary method.
    pub fn with_method(url: Url, method: &str) -> Self {
        Self { method: method.to_ascii_uppercase(), ..Self::get(url) }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// True for `http` and `https` URLs.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A buffered response snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: String::new(), headers: Vec::new(), body: body.into() }
    }

    /// A JSON response with `Content-Type: application/json`.
    pub fn json(status: u16, status_text: &str, value: &serde_json::Value) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self {
            status,
            status_text: status_text.to_string(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Bytes::from(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_status_text(mut self, status_text: &str) -> Self {
        self.status_text = status_text.to_string();
        self
    }

    /// Mirrors the Fetch API `ok` flag: status in 200..=299.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
