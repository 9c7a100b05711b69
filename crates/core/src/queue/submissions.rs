//! Pending submission CRUD operations.

use crate::Error;
use crate::cache::connection::prepare;
use crate::cache::migrations::{self, PORTFOLIO_MIGRATIONS};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::{Connection, params};

/// Logical name of the submission store.
pub const STORE_NAME: &str = "PortfolioDB";

/// Schema version the store is migrated to on open.
pub const SCHEMA_VERSION: i64 = 1;

/// A form submission that could not be delivered yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PendingSubmission {
    pub id: i64,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// The submitted form fields, stored verbatim.
    pub data: serde_json::Value,
    /// Failed delivery attempts so far.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<String>,
}

/// Submission store handle.
#[derive(Clone, Debug)]
pub struct SubmissionDb {
    conn: Connection,
}

/// Surface store failures as queue errors so callers can tell them apart
/// from cache storage failures.
fn queue_error(err: Error) -> Error {
    match err {
        Error::Database(e) => Error::Queue(e.to_string()),
        Error::MigrationFailed(msg) => Error::Queue(format!("migration failed: {msg}")),
        other => other,
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SubmissionDb {
    /// Open the store at `path`, creating and migrating it as needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;
        prepare(&conn, PORTFOLIO_MIGRATIONS).await.map_err(queue_error)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;
        prepare(&conn, PORTFOLIO_MIGRATIONS).await.map_err(queue_error)?;
        Ok(Self { conn })
    }

    pub async fn schema_version(&self) -> Result<i64, Error> {
        migrations::schema_version(&self.conn).await.map_err(queue_error)
    }

    /// Durably store a submission and return its id.
    pub async fn add(&self, data: &serde_json::Value) -> Result<i64, Error> {
        let data = serde_json::to_string(data).map_err(|e| Error::InvalidInput(format!("payload: {e}")))?;
        let timestamp = now();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute("INSERT INTO pending_forms (timestamp, data) VALUES (?1, ?2)", params![timestamp, data])?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
            .map_err(queue_error)
    }

    /// All pending submissions in insertion (id) order.
    ///
    /// Rows whose payload no longer decodes are logged and left out so they
    /// cannot hold up the rest of the queue.
    pub async fn pending(&self) -> Result<Vec<PendingSubmission>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<RowParts>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, data, attempts, last_error, last_attempt_at
                    FROM pending_forms ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map([], row_to_parts)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
            .map_err(queue_error)?;

        let pending = rows
            .into_iter()
            .filter_map(|parts| match PendingSubmission::try_from(parts) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable pending submission");
                    None
                }
            })
            .collect();
        Ok(pending)
    }

    /// Fetch one submission by id.
    pub async fn get(&self, id: i64) -> Result<Option<PendingSubmission>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<PendingSubmission>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, data, attempts, last_error, last_attempt_at
                    FROM pending_forms WHERE id = ?1",
                )?;
                match stmt.query_row(params![id], row_to_parts) {
                    Ok(parts) => Ok(Some(PendingSubmission::try_from(parts)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
            .map_err(queue_error)
    }

    /// Remove a delivered submission. Returns false if it was already gone.
    pub async fn remove(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM pending_forms WHERE id = ?1", params![id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
            .map_err(queue_error)
    }

    /// Record a failed delivery attempt, keeping the submission queued.
    pub async fn record_failure(&self, id: i64, reason: &str) -> Result<(), Error> {
        let reason = reason.to_string();
        let attempted_at = now();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE pending_forms
                    SET attempts = attempts + 1, last_error = ?2, last_attempt_at = ?3
                    WHERE id = ?1",
                    params![id, reason, attempted_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
            .map_err(queue_error)
    }

    pub async fn count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_forms", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
            .map_err(queue_error)
    }
}

type RowParts = (i64, String, String, u32, Option<String>, Option<String>);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowParts> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

impl TryFrom<RowParts> for PendingSubmission {
    type Error = Error;

    fn try_from((id, timestamp, data, attempts, last_error, last_attempt_at): RowParts) -> Result<Self, Error> {
        let data = serde_json::from_str(&data).map_err(|e| Error::CorruptEntry(format!("pending form {id}: {e}")))?;
        Ok(Self { id, timestamp, data, attempts, last_error, last_attempt_at })
    }
}
