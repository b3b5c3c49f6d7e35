//! The one error enum every WikiForge library returns.
//!
//! The `wikiforge` binary converts it into a `color-eyre` report at the top
//! of each command.

use std::path::PathBuf;

/// Failure of any stage of a generation run, or of the tooling around it.
#[derive(Debug, thiserror::Error)]
pub enum WikiForgeError {
    /// `wikiforge.toml` could not be read, or a required credential env var is unset.
    #[error("config error: {message}")]
    Config { message: String },

    /// Request never got an HTTP answer (connect, TLS, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The text-generation service rejected a request or returned nothing usable.
    #[error("generation error: {0}")]
    Generation(String),

    /// Notion answered with a non-success status.
    #[error("document store error ({status}): {message}")]
    DocumentStore { status: u16, message: String },

    /// A Notion response body was not the JSON shape expected.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Status database error.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Bad user input: share URL without a database id, heading without content.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A section worker panicked, or the status writer task died.
    #[error("task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, WikiForgeError>;

impl WikiForgeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Error reported by Notion: HTTP status plus the body's `message` field.
    pub fn document_store(status: u16, msg: impl Into<String>) -> Self {
        Self::DocumentStore {
            status,
            message: msg.into(),
        }
    }

    /// Filesystem failure on `path` (config file, status database directory).
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
