//! SQLite-backed cache storage with named generations.
//!
//! This module provides a persistent equivalent of the browser Cache Storage
//! API using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named generations (`static-v1`, `dynamic-v1`) opened lazily by name
//! - Request-keyed entries with buffered response snapshots
//! - Whole-generation deletion with cascading entry eviction
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod generation;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use generation::{Generation, GenerationSet, Role};
pub use storage::{Cache, CacheKey};
