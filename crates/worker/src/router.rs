//! Strategy selection.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. URL contains a network-first pattern (`/api/`, `https://api.`)
//! 2. URL path ends with a static-asset extension (images, fonts)
//! 3. everything else is stale-while-revalidate
//!
//! Routing is pure; callers filter to GET http(s) requests with
//! [`should_intercept`] first.

use folio_core::{AppConfig, Request};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A fetch strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::NetworkFirst => "network-first",
            Strategy::CacheFirst => "cache-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        })
    }
}

/// Request-matching predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Full URL contains any of the substrings.
    UrlContains(Vec<String>),
    /// URL path ends with any of the suffixes (ASCII case-insensitive).
    PathEndsWith(Vec<String>),
}

impl Matcher {
    pub fn matches(&self, url: &Url) -> bool {
        match self {
            Matcher::UrlContains(patterns) => {
                let href = url.as_str();
                patterns.iter().any(|p| href.contains(p.as_str()))
            }
            Matcher::PathEndsWith(suffixes) => {
                let path = url.path().to_ascii_lowercase();
                suffixes.iter().any(|s| path.ends_with(&s.to_ascii_lowercase()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyRule {
    pub matcher: Matcher,
    pub strategy: Strategy,
}

/// Ordered rule table with a stale-while-revalidate default.
#[derive(Debug, Clone)]
pub struct StrategyRouter {
    rules: Vec<StrategyRule>,
}

impl StrategyRouter {
    pub fn new(network_first_patterns: Vec<String>, cache_first_extensions: Vec<String>) -> Self {
        Self {
            rules: vec![
                StrategyRule { matcher: Matcher::UrlContains(network_first_patterns), strategy: Strategy::NetworkFirst },
                StrategyRule { matcher: Matcher::PathEndsWith(cache_first_extensions), strategy: Strategy::CacheFirst },
            ],
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.network_first_patterns.clone(), config.cache_first_extensions.clone())
    }

    pub fn rules(&self) -> &[StrategyRule] {
        &self.rules
    }

    /// Pick the strategy for `url`. Always returns exactly one strategy.
    pub fn classify(&self, url: &Url) -> Strategy {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(url))
            .map(|rule| rule.strategy)
            .unwrap_or(Strategy::StaleWhileRevalidate)
    }
}

/// Whether the worker should intercept `request` at all.
///
/// Non-GET requests and non-http(s) schemes go straight to the network.
pub fn should_intercept(request: &Request) -> bool {
    request.is_get() && request.is_http()
}
