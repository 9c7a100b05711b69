//! Durable store for contact-form submissions awaiting delivery.
//!
//! `PortfolioDB` is a separate SQLite file from cache storage. It holds one
//! collection, `pending_forms`, keyed by an auto-incrementing id and indexed
//! by creation timestamp.

pub mod submissions;

pub use submissions::{PendingSubmission, SCHEMA_VERSION, STORE_NAME, SubmissionDb};
