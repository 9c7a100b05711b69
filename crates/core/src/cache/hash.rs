//! Cache key normalization and hashing.
//!
//! A cache key is the request method plus its normalized URL:
//!
//! - method upper-cased
//! - fragment removed
//! - query string kept verbatim (not reordered, not dropped)
//! - path kept as-is, so `/about` and `/about/` are distinct entries
//!
//! Host lower-casing and default-port elision come from URL parsing.

use sha2::{Digest, Sha256};
use url::Url;

/// Normalize a URL for use in a cache key.
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Compute the storage key for a (method, url) pair.
pub fn compute_cache_key(method: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_url(url).as_bytes());
    hex::encode(hasher.finalize())
}
