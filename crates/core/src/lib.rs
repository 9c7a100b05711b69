//! Core types and shared functionality for folio-sw.
//!
//! This crate provides:
//! - Request/response snapshots passed between the worker and its stores
//! - Cache storage with named generations on a SQLite backend
//! - The durable submission store backing the deferred queue
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod queue;

pub use cache::{Cache, CacheDb, CacheKey, Generation, GenerationSet, Role};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Request, Response};
pub use queue::{PendingSubmission, SubmissionDb};
