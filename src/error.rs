//! Error types for schema loading and diagram generation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading schemas or building a diagram.
///
/// Every variant is fatal: generation is all-or-nothing and no partial
/// diagram is produced.
#[derive(Debug, Error)]
pub enum DiagramError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Schema errors (exit code 2)
    #[error("invalid schema document {location}: {message}")]
    FileFormat { location: String, message: String },

    #[error("inheritance cycle detected: {}", chain.join(" -> "))]
    InheritanceCycle { chain: Vec<String> },

    #[error("invalid reference \"{reference}\": {message}")]
    InvalidReference { reference: String, message: String },

    #[cfg(feature = "remote")]
    #[error("invalid reference \"{url}\": {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid value \"{value}\" for {option}: expected {expected}")]
    InvalidOption {
        option: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl DiagramError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DiagramError::FileNotFound { .. } | DiagramError::ReadError { .. } => 3,
            _ => 2,
        }
    }

    pub(crate) fn format(location: impl ToString, message: impl ToString) -> Self {
        DiagramError::FileFormat {
            location: location.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        DiagramError::InvalidReference {
            reference: reference.into(),
            message: message.into(),
        }
    }
}
