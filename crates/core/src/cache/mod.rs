//! SQLite-backed store for versioned response caches.
//!
//! This module provides a persistent cache of request/response pairs
//! grouped into named generations, using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Request keys derived from SHA-256 of method and canonical URL
//! - Generations (`static-<version>`, `dynamic-<version>`) that are
//!   created on first use and dropped wholesale with their entries
//! - Generation-agnostic lookups that prefer a named generation, then the newest
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;
pub use generations::{Bucket, GenerationInfo};
