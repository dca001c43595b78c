//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and sweeping the cache generations.

pub mod list;
pub mod sweep;

pub use list::{CacheListParams, list_impl};
pub use sweep::{CacheSweepParams, sweep_impl};
