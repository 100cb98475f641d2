//! Error types for docsetkit.
//!
//! Library crates use [`DocsetError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docsetkit operations.
///
/// Every variant is fatal for a build: components surface them unchanged and
/// the pipeline aborts on the first one.
#[derive(Debug, thiserror::Error)]
pub enum DocsetError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed input that could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Index store error (open, schema, query).
    #[error("storage error: {0}")]
    Storage(String),

    /// Duplicate `(name, type, path)` insertion into the search index.
    #[error("integrity error: duplicate index record (name={name:?}, type={category:?}, path={path:?})")]
    Integrity {
        name: String,
        category: String,
        path: String,
    },

    /// The external document renderer could not be run or exited non-zero.
    #[error("render error: {0}")]
    Render(String),

    /// A required resource file (e.g. the landing-page template) is unavailable.
    #[error("resource error at {path:?}: {message}")]
    Resource { path: PathBuf, message: String },

    /// Template compilation or rendering error.
    #[error("template error: {0}")]
    Template(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad descriptor, inconsistent package, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocsetError>;

impl DocsetError {
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

    /// Create a resource error for a missing or unreadable resource file.
    pub fn resource(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Resource {
            path: path.into(),
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

    /// Whether this error is a uniqueness violation in the search index.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}
