//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Generation-scoped response cache with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Bucket, CacheDb, CachedResponse, GenerationInfo};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
