//! Error types for the gallery crawler.
//!
//! Most failures in a crawl are local to one page or one item and are
//! reported through the event sink instead of being returned. The variants
//! here cover what the collaborators hand back to their callers.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the crawler library.
#[derive(Debug, Error)]
pub enum CrawlError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Could not fetch the first list page: {url}")]
    FirstPageUnavailable { url: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to move {src} to {dest}: {message}")]
    MigrationFailed {
        src: PathBuf,
        dest: PathBuf,
        message: String,
    },

    #[error("Transcode failed for {input}: {message}")]
    TranscodeFailed { input: PathBuf, message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

impl From<std::io::Error> for CrawlError {
    fn from(err: std::io::Error) -> Self {
        CrawlError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CrawlError {
    fn from(err: serde_json::Error) -> Self {
        CrawlError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CrawlError::Timeout(Duration::from_secs(0))
        } else {
            CrawlError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl CrawlError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CrawlError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        CrawlError::Config {
            message: message.into(),
        }
    }

    /// Check if this error should trigger another request attempt.
    ///
    /// Any unexpected status is retried; a 404 is a definitive answer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CrawlError::Network { .. } | CrawlError::Timeout(_) | CrawlError::HttpStatus { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrawlError::HttpStatus {
            url: "https://example.com/".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP status 503 for https://example.com/");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(CrawlError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(CrawlError::HttpStatus {
            url: "u".into(),
            status: 403
        }
        .is_retryable());
        assert!(!CrawlError::NotFound { url: "u".into() }.is_retryable());
        assert!(!CrawlError::config("bad").is_retryable());
    }

    #[test]
    fn test_io_with_path_keeps_path() {
        let err = CrawlError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/x",
        );
        match err {
            CrawlError::Io { path, .. } => assert_eq!(path, Some(PathBuf::from("/tmp/x"))),
            other => panic!("unexpected {other:?}"),
        }
    }
}
