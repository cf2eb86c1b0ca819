//! Error types for DLP
//!
//! Every failure a stage can report maps onto one of these variants. Messages
//! carry the context an operator needs: which file or URL, and what was
//! expected versus observed.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for DLP operations
pub type Result<T> = std::result::Result<T, DlpError>;

/// Main error type for DLP
#[derive(Error, Debug)]
pub enum DlpError {
    /// Filesystem operation on a known path failed
    #[error("Storage error at '{}': {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact expected on disk is absent
    #[error("Storage error: '{}' not found", .0.display())]
    NotFound(PathBuf),

    /// Non-2xx response, transport failure or undecodable body
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// Source document does not have the layout the extractor relies on
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Stored bytes do not hash to the expected digest
    #[error("Unexpected change in '{}': expected checksum {expected}, got {actual}", .path.display())]
    Integrity {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// External analysis program could not run or exited unsuccessfully
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DlpError {
    /// Create a storage error for `path`, mapping `NotFound` to [`DlpError::NotFound`]
    pub fn storage(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Storage { path, source }
        }
    }

    /// Create a network error
    pub fn network(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a checksum mismatch error
    pub fn integrity(
        path: impl AsRef<Path>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Integrity {
            path: path.as_ref().to_path_buf(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short label for the error kind, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage { .. } | Self::NotFound(_) => "storage",
            Self::Network { .. } => "network",
            Self::Extraction(_) => "extraction",
            Self::Integrity { .. } => "integrity",
            Self::Analysis(_) => "analysis",
            Self::Config(_) => "config",
        }
    }
}
