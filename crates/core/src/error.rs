//! Unified error types for offcache.
//!
//! Only install failures are meant to reach a user; everything else is
//! recovered by the fallback path before a response leaves the worker.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offcache worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unparseable event).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or non-interceptable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be encoded or decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// The request never produced a response (offline, refused, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// A static asset could not be cached during install.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// An event arrived in a lifecycle state that cannot accept it.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),
}

impl Error {
    /// Whether this error means the network produced no response.
    ///
    /// These are the failures the handlers recover from by consulting the cache.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::Network(msg) => (-32008, msg.clone()),
            Error::InstallFailed(msg) => (-32013, msg.clone()),
            Error::Lifecycle(msg) => (-32014, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptEntry(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InstallFailed("/app.css returned 404".to_string());
        assert!(err.to_string().starts_with("INSTALL_FAILED"));
        assert!(err.to_string().contains("/app.css"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::Network("offline".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32008);
    }

    #[test]
    fn test_is_network() {
        assert!(Error::Network("refused".into()).is_network());
        assert!(Error::FetchTimeout("20000ms".into()).is_network());
        assert!(!Error::InstallFailed("x".into()).is_network());
        assert!(!Error::CorruptEntry("x".into()).is_network());
    }
}
