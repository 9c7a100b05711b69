//! Network transport for folio-sw.
//!
//! This crate provides URL canonicalization and the `Fetcher` seam the worker
//! uses for every live request, with a reqwest-backed implementation.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Fetcher, UrlError, canonicalize, canonicalize_against};
