//! Error types for carebook.
//!
//! Library crates use [`CarebookError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::Stage;

/// Top-level error type for all carebook operations.
#[derive(Debug, thiserror::Error)]
pub enum CarebookError {
    /// No snapshot directory matches the requested source name.
    #[error("no corpus snapshot found for '{source_name}' under {root:?}")]
    CorpusNotFound { root: PathBuf, source_name: String },

    /// A snapshot exists but its full-text file does not.
    #[error("corpus text file missing: {path:?}")]
    CorpusFileMissing { path: PathBuf },

    /// The host document to merge into does not exist.
    #[error("host document not found: {path:?}")]
    HostNotFound { path: PathBuf },

    /// Neither region markers nor the insertion anchor were found.
    #[error("no insertion point for region '{region}': anchor {anchor:?} not found")]
    InsertionPointNotFound { region: String, anchor: String },

    /// Only part of a marker pair exists for a region.
    #[error("malformed region '{region}': {message}")]
    MalformedRegion { region: String, message: String },

    /// A stage selection was non-numeric or out of range.
    #[error("invalid selection '{input}': expected a number between 1 and {max}")]
    InvalidSelection { input: String, max: usize },

    /// The article's backing file vanished before a stage transition.
    #[error("stage file missing: {path:?}")]
    StageFileMissing { path: PathBuf },

    /// A create-new write hit an existing file.
    #[error("file already exists: {path:?}")]
    AlreadyExists { path: PathBuf },

    /// A stage transition that is not strictly forward.
    #[error("invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad subject id, unsafe target page, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CarebookError>;

impl CarebookError {
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
}
