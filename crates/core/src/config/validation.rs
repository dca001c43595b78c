//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `version` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `janitor_interval_secs` is under a minute or `max_age_days` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.has_host() => {}
            Ok(origin) => return Err(invalid("origin", format!("unsupported origin: {origin}"))),
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if self.janitor_interval_secs < 60 {
            return Err(invalid("janitor_interval_secs", "must be at least 60 seconds"));
        }

        if self.max_age_days == 0 {
            return Err(invalid("max_age_days", "must be at least 1 day"));
        }

        if self.static_manifest.is_empty() {
            tracing::warn!("static_manifest is empty; offline fallback will have no root document");
        }

        Ok(())
    }
}
