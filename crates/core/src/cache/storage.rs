//! Cache generation and entry operations.
//!
//! `CacheDb` manages generation names (open, list, delete, size); a `Cache`
//! handle scopes entry reads and writes to one generation.

use super::connection::CacheDb;
use super::hash::{compute_cache_key, normalize_url};
use crate::{Error, Request, Response};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// An enumerated cache entry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
    pub cached_at: String,
}

/// Handle to a single named generation.
#[derive(Clone, Debug)]
pub struct Cache {
    db: CacheDb,
    name: String,
}

/// A validated row ready for insertion.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Bytes,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::UnsupportedRequest(format!("cannot cache {} {}", request.method, request.url)));
        }
        if !request.is_http() {
            return Err(Error::UnsupportedRequest(format!("cannot cache scheme {}", request.url.scheme())));
        }
        if response.status == 206 {
            return Err(Error::UnsupportedRequest(format!("cannot cache partial response for {}", request.url)));
        }

        Ok(Self {
            key_hash: compute_cache_key(&request.method, &request.url),
            method: request.method.to_ascii_uppercase(),
            url: normalize_url(&request.url),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
        })
    }
}

impl CacheDb {
    /// Open a generation by name, creating it if it doesn't exist.
    pub async fn open_cache(&self, name: &str) -> Result<Cache, Error> {
        let owned = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?1, ?2)",
                    params![owned, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Cache { db: self.clone(), name: name.to_string() })
    }

    /// Check whether a generation exists without creating it.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation name, oldest first.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_generations ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Sum of stored body lengths across every generation.
    pub async fn total_size(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let size: i64 =
                    conn.query_row("SELECT COALESCE(SUM(LENGTH(body)), 0) FROM cache_entries", [], |row| row.get(0))?;
                Ok(size as u64)
            })
            .await
            .map_err(Error::from)
    }
}

impl Cache {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the stored response for `request`.
    ///
    /// Non-GET requests never match.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }

        let key_hash = compute_cache_key(&request.method, &request.url);
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body
                    FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, key_hash], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                });

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(Response { status, status_text, headers, body: Bytes::from(body) }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store `response` for `request`, overwriting any previous entry.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        self.write_rows(vec![row]).await
    }

    /// Store several entries atomically: either all are written or none.
    pub async fn put_all(&self, entries: &[(Request, Response)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_rows(rows).await
    }

    async fn write_rows(&self, rows: Vec<EntryRow>) -> Result<(), Error> {
        let name = self.name.clone();
        let cached_at = Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                // The generation may have been evicted since this handle was opened.
                tx.execute(
                    "INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?1, ?2)",
                    params![name, cached_at],
                )?;
                for row in &rows {
                    tx.execute(
                        "INSERT INTO cache_entries (
                        cache_name, key_hash, method, url, status, status_text, headers_json, body, cached_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        cached_at = excluded.cached_at",
                        params![
                            &name,
                            &row.key_hash,
                            &row.method,
                            &row.url,
                            row.status,
                            &row.status_text,
                            &row.headers_json,
                            &row.body[..],
                            &cached_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for `request`. Returns false if there was none.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let key_hash = compute_cache_key(&request.method, &request.url);
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Enumerate entry keys in insertion order.
    pub async fn keys(&self) -> Result<Vec<CacheKey>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<CacheKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, cached_at FROM cache_entries
                    WHERE cache_name = ?1 ORDER BY rowid ASC",
                )?;
                let keys = stmt
                    .query_map(params![name], |row| {
                        Ok(CacheKey { method: row.get(0)?, url: row.get(1)?, cached_at: row.get(2)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Sum of stored body lengths in this generation.
    pub async fn size(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let size: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM cache_entries WHERE cache_name = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(size as u64)
            })
            .await
            .map_err(Error::from)
    }
}
