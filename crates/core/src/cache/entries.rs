//! Cache entry CRUD operations.
//!
//! Entries are response snapshots keyed by the hash of their normalized
//! request. Only successful (2xx) responses are accepted.

use super::connection::CacheDb;
use super::generations::ensure_generation;
use super::hash::compute_cache_key;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Hash of method and canonical URL.
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: Option<String>,
    /// Header pairs in the order the origin sent them.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedResponse {
    /// Build a snapshot for `method url`, stamping `stored_at` with the current time.
    pub fn new(method: &str, url: &str, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            key: compute_cache_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status,
            status_text: None,
            headers,
            body,
            stored_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// When the origin produced this response, from its `date` header.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.header("date").and_then(parse_http_date)
    }
}

/// Parse an HTTP `date` header value.
///
/// Accepts IMF-fixdate / RFC 2822 (`Sun, 06 Nov 1994 08:49:37 GMT`) and RFC 3339.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

struct RawEntry {
    key: String,
    method: String,
    url: String,
    status: u16,
    status_text: Option<String>,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl RawEntry {
    const COLUMNS: &'static str = "key_hash, method, url, status, status_text, headers_json, body, stored_at";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            status: row.get(3)?,
            status_text: row.get(4)?,
            headers_json: row.get(5)?,
            body: row.get(6)?,
            stored_at: row.get(7)?,
        })
    }

    fn decode(self) -> Result<CachedResponse, Error> {
        Ok(CachedResponse {
            key: self.key,
            method: self.method,
            url: self.url,
            status: self.status,
            status_text: self.status_text,
            headers: serde_json::from_str(&self.headers_json)?,
            body: self.body,
            stored_at: self.stored_at,
        })
    }
}

fn upsert(conn: &rusqlite::Connection, generation: &str, entry: &CachedResponse) -> Result<(), Error> {
    if !entry.is_success() {
        return Err(Error::InvalidInput(format!(
            "refusing to cache {} {} with status {}",
            entry.method, entry.url, entry.status
        )));
    }
    let headers_json = serde_json::to_string(&entry.headers)?;
    conn.execute(
        "INSERT INTO cache_entries (
            generation, key_hash, method, url, status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            &entry.key,
            &entry.method,
            &entry.url,
            entry.status,
            &entry.status_text,
            headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Insert or replace an entry in a generation, creating the generation if needed.
    ///
    /// Concurrent puts on the same key resolve last-writer-wins.
    pub async fn put_entry(&self, generation: &str, entry: &CachedResponse) -> Result<(), Error> {
        let generation = generation.to_string();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation)?;
                upsert(&tx, &generation, &entry)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert a batch of entries atomically.
    ///
    /// Either every entry is stored or none is; a rejected entry rolls the
    /// whole batch back, including creation of the generation.
    pub async fn put_entries(&self, generation: &str, entries: Vec<CachedResponse>) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation)?;
                for entry in &entries {
                    upsert(&tx, &generation, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry within one generation.
    pub async fn match_entry(&self, generation: &str, key: &str) -> Result<Option<CachedResponse>, Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let sql = format!(
                    "SELECT {} FROM cache_entries WHERE generation = ?1 AND key_hash = ?2",
                    RawEntry::COLUMNS
                );
                let result = conn.query_row(&sql, params![generation, key], RawEntry::from_row);

                match result {
                    Ok(raw) => raw.decode().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry in any generation.
    ///
    /// An entry in `preferred` wins; otherwise the newest generation holding the key answers.
    pub async fn match_any(&self, preferred: &str, key: &str) -> Result<Option<CachedResponse>, Error> {
        let preferred = preferred.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let sql = format!(
                    "SELECT {} FROM cache_entries e
                     JOIN cache_generations g ON g.name = e.generation
                     WHERE e.key_hash = ?1
                     ORDER BY (e.generation = ?2) DESC, g.id DESC
                     LIMIT 1",
                    RawEntry::COLUMNS
                        .split(", ")
                        .map(|c| format!("e.{c}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                let result = conn.query_row(&sql, params![key, preferred], RawEntry::from_row);

                match result {
                    Ok(raw) => raw.decode().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Keys of every entry in a generation.
    pub async fn entry_keys(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key_hash FROM cache_entries WHERE generation = ?1 ORDER BY rowid ASC")?;
                let keys = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it was not present.
    pub async fn delete_entry(&self, generation: &str, key: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE generation = ?1 AND key_hash = ?2",
                    params![generation, key],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a generation.
    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
