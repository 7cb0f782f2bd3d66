//! Error types for teamscrape.
//!
//! Library crates use [`TeamScrapeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all teamscrape operations.
#[derive(Debug, thiserror::Error)]
pub enum TeamScrapeError {
    /// A checkpoint artifact or input file is absent.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A persisted artifact or fetched document could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The team-page extractor failed for one page.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// A seed's team page could not be resolved.
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad key, bad URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TeamScrapeError>;

impl TeamScrapeError {
    /// Create a not-found error naming the missing thing.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Whether this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is a `Parse` error.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
