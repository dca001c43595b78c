//! Generation (named cache bucket) operations.
//!
//! A generation is a named bucket of entries such as `static-v1.0.0`.
//! Generations are created on first open or first write and are deleted
//! wholesale, entries included, when a newer version activates.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Logical cache bucket. Each bucket has exactly one current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Install-time manifest assets.
    Static,
    /// Everything written by request handlers and preloads.
    Dynamic,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Static => "static",
            Bucket::Dynamic => "dynamic",
        }
    }

    /// Generation name of this bucket for a deploy version.
    pub fn generation(self, version: &str) -> String {
        format!("{}-{version}", self.as_str())
    }
}

/// Summary of one stored generation.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

pub(crate) fn ensure_generation(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO cache_generations (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

impl CacheDb {
    /// Open (create if missing) a generation.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_generation(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a generation exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List generation names in creation order.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_generations ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// List generations with their entry counts, in creation order.
    pub async fn generation_info(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, COUNT(e.key_hash)
                     FROM cache_generations g
                     LEFT JOIN cache_entries e ON e.generation = g.name
                     GROUP BY g.id
                     ORDER BY g.id ASC",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(GenerationInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry in it.
    ///
    /// Returns false if the generation did not exist.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_generations WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
