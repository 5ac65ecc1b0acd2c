//! Core types for docmeta
//!
//! - Keyspace: bucket → scope → collection coordinates of a document set

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fully qualified collection coordinates
///
/// Scope and collection default to `_default`. The text form is
/// `bucket.scope.collection`; a bare `bucket` means its default collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Keyspace {
    /// Bucket name
    pub bucket: String,
    /// Scope name
    pub scope: String,
    /// Collection name
    pub collection: String,
}

impl Keyspace {
    /// Name of the default scope and default collection
    pub const DEFAULT: &'static str = "_default";

    /// Create a keyspace
    pub fn new(
        bucket: impl Into<String>,
        scope: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            scope: scope.into(),
            collection: collection.into(),
        }
    }

    /// The default collection of a bucket
    pub fn default_for(bucket: impl Into<String>) -> Self {
        Self::new(bucket, Self::DEFAULT, Self::DEFAULT)
    }
}

impl fmt::Display for Keyspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.bucket, self.scope, self.collection)
    }
}

impl FromStr for Keyspace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::invalid_argument(format!("invalid keyspace '{}'", s)));
        }
        match parts.as_slice() {
            [bucket] => Ok(Keyspace::default_for(*bucket)),
            [bucket, scope, collection] => Ok(Keyspace::new(*bucket, *scope, *collection)),
            _ => Err(Error::invalid_argument(format!(
                "invalid keyspace '{}': expected bucket or bucket.scope.collection",
                s
            ))),
        }
    }
}
