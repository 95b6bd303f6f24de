//! Error types for serprank.
//!
//! Library crates use [`SerpRankError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all serprank operations.
#[derive(Debug, thiserror::Error)]
pub enum SerpRankError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a page or an API.
    #[error("network error: {0}")]
    Network(String),

    /// A request did not complete within its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// HTML or API response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The SERP source failed. Fatal for a search request.
    #[error("SERP error: {0}")]
    Serp(String),

    /// The external ranking service failed or answered with garbage.
    #[error("ranking error: {0}")]
    Ranking(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input or settings (zero concurrency, empty query, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SerpRankError>;

impl SerpRankError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SerpRankError::config("missing DATAFORSEO_LOGIN");
        assert_eq!(err.to_string(), "config error: missing DATAFORSEO_LOGIN");

        let err = SerpRankError::validation("concurrency must be at least 1");
        assert!(err.to_string().contains("at least 1"));

        let err = SerpRankError::Serp("task status 40501".into());
        assert_eq!(err.to_string(), "SERP error: task status 40501");
    }
}
