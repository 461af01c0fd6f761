//! Error taxonomy shared by every vault operation.
//!
//! Internal code propagates [`VaultError`]; the operation boundary flattens it
//! into an [`OperationFailure`] that serializes as a structured result.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while indexing, querying or mutating the vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A note reference could not be resolved.
    #[error("note not found: {input}")]
    NotFound {
        /// The reference as supplied by the caller.
        input: String,
        /// Up to ten near matches, best first.
        suggestions: Vec<String>,
    },
    /// A caller-supplied path resolves outside the vault root.
    #[error("path escapes vault root: {0}")]
    PathEscapesRoot(String),
    /// Malformed or missing arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The vault root is absent or not a directory.
    #[error("vault root is missing or not a directory: {}", .0.display())]
    RootMissing(PathBuf),
    /// A filesystem call failed.
    #[error("io failure at {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A snapshot could not be encoded or decoded.
    #[error("serialization failure: {0}")]
    Serialization(String),
    /// The embedding provider rejected a request.
    #[error("embedding provider failure: {0}")]
    Provider(String),
}

/// Result alias used across the crate.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Wrap an IO error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for [`VaultError::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Classification exposed to hosts.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::PathEscapesRoot(_) => FailureKind::PathEscapesRoot,
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::RootMissing(_) | Self::Io { .. } => FailureKind::IoFailure,
            Self::Provider(_) => FailureKind::ProviderInitFailure,
            Self::Serialization(_) => FailureKind::Internal,
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Failure categories reported at the operation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Reference did not resolve.
    NotFound,
    /// Path outside the vault.
    PathEscapesRoot,
    /// Bad arguments.
    InvalidInput,
    /// Filesystem failure.
    IoFailure,
    /// Embedding provider could not start or answer.
    ProviderInitFailure,
    /// Anything else, including panics caught by the host loop.
    Internal,
}

/// Structured failure returned by [`crate::Engine::execute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable message.
    pub message: String,
    /// Near matches for `not_found`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl OperationFailure {
    /// Build a failure without suggestions.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestions: Vec::new(),
        }
    }
}

impl From<VaultError> for OperationFailure {
    fn from(err: VaultError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        let suggestions = match err {
            VaultError::NotFound { suggestions, .. } => suggestions,
            _ => Vec::new(),
        };
        Self {
            kind,
            message,
            suggestions,
        }
    }
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for OperationFailure {}
