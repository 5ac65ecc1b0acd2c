//! Error types for docmeta
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors fall into three groups:
//! - connection-level (`Authentication`, `Unavailable`): fatal to a whole run
//! - per-operation (`DocumentNotFound`, `PathNotFound`, ...): scoped to one document
//! - listing-level (`Query`): aborts a filter run

use crate::contract::Cas;
use crate::limits::LimitError;
use crate::path::PathParseError;
use thiserror::Error;

/// Result type alias for docmeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for docmeta
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Credentials were rejected by the store
    #[error("authentication failed for user '{user}'")]
    Authentication {
        /// The user that failed to authenticate
        user: String,
    },

    /// No store node could be reached, or the session was released
    #[error("service unavailable at {address}: {reason}")]
    Unavailable {
        /// Address (or connection string) that was tried
        address: String,
        /// Why the node could not be used
        reason: String,
    },

    /// Bucket, scope or collection does not exist
    #[error("keyspace not found: {0}")]
    KeyspaceNotFound(String),

    /// Document does not exist (or has expired)
    #[error("document not found: {id}")]
    DocumentNotFound {
        /// Document key
        id: String,
    },

    /// Document already exists
    #[error("document already exists: {id}")]
    DocumentExists {
        /// Document key
        id: String,
    },

    /// Path does not exist in the document
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was addressed
        path: String,
    },

    /// Path already exists (insert-only write)
    #[error("path already exists: {path}")]
    PathExists {
        /// The path that was addressed
        path: String,
    },

    /// Path traverses a value of the wrong type
    #[error("path mismatch at {path}: expected {expected}, found {found}")]
    PathMismatch {
        /// The path that was addressed
        path: String,
        /// Expected container type
        expected: &'static str,
        /// Actual value type
        found: &'static str,
    },

    /// Attempt to write or remove a store-computed virtual attribute
    #[error("read-only field: {path}")]
    ReadOnlyField {
        /// The virtual path
        path: String,
    },

    /// Compare-and-swap check failed
    #[error("CAS mismatch on {id}: expected {expected}, found {actual}")]
    CasMismatch {
        /// Document key
        id: String,
        /// CAS supplied by the caller
        expected: Cas,
        /// CAS currently stored
        actual: Cas,
    },

    /// Request is malformed (bad path, bad option combination, too many specs)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A size or depth limit was exceeded
    #[error("limit exceeded: {0}")]
    Limit(#[from] LimitError),

    /// The query service failed or returned a malformed row
    #[error("query error: {0}")]
    Query(String),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`Error`] used for propagation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Session-level failure; every later operation will fail too
    Connection,
    /// Failure scoped to one document
    Document,
    /// Failure of the listing (query) stream
    Listing,
    /// Caller error, configuration error or internal fault
    Other,
}

impl Error {
    /// Build a `DocumentNotFound` error
    pub fn document_not_found(id: impl Into<String>) -> Self {
        Error::DocumentNotFound { id: id.into() }
    }

    /// Build a `PathNotFound` error
    pub fn path_not_found(path: impl ToString) -> Self {
        Error::PathNotFound {
            path: path.to_string(),
        }
    }

    /// Build a `PathExists` error
    pub fn path_exists(path: impl ToString) -> Self {
        Error::PathExists {
            path: path.to_string(),
        }
    }

    /// Build a `ReadOnlyField` error
    pub fn read_only(path: impl ToString) -> Self {
        Error::ReadOnlyField {
            path: path.to_string(),
        }
    }

    /// Build an `InvalidArgument` error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Build an `Unavailable` error
    pub fn unavailable(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Unavailable {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Build a `Query` error
    pub fn query(msg: impl Into<String>) -> Self {
        Error::Query(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Authentication { .. } | Error::Unavailable { .. } => ErrorKind::Connection,
            Error::DocumentNotFound { .. }
            | Error::DocumentExists { .. }
            | Error::PathNotFound { .. }
            | Error::PathExists { .. }
            | Error::PathMismatch { .. }
            | Error::ReadOnlyField { .. }
            | Error::CasMismatch { .. }
            | Error::InvalidArgument(_)
            | Error::Limit(_) => ErrorKind::Document,
            Error::Query(_) => ErrorKind::Listing,
            Error::KeyspaceNotFound(_) | Error::Config(_) | Error::Internal(_) => ErrorKind::Other,
        }
    }

    /// True if the error only concerns the document being operated on
    pub fn is_per_document(&self) -> bool {
        self.kind() == ErrorKind::Document
    }
}

impl From<PathParseError> for Error {
    fn from(e: PathParseError) -> Self {
        Error::InvalidArgument(format!("invalid path: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidArgument(format!("invalid JSON: {}", e))
    }
}
