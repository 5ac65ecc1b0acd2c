//! Stored document record
//!
//! A document is a body plus a separate map of extended attributes, plus the
//! state the store owns (CAS, sequence number, modification time, expiry).
//! Extended attributes never appear in the body.

use crate::contract::{Cas, Timestamp};
use crate::value::DocValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document key
    pub id: String,
    /// Main body
    pub body: DocValue,
    /// Extended attributes by name
    pub xattrs: BTreeMap<String, DocValue>,
    /// CAS assigned by the last mutation
    pub cas: Cas,
    /// Sequence number assigned by the last mutation
    pub seqno: u64,
    /// Time of the last mutation
    pub last_modified: Timestamp,
    /// Absolute expiry, if any
    pub expiry: Option<Timestamp>,
}

impl Document {
    /// Create an unstored document (zero CAS, no attributes)
    pub fn new(id: impl Into<String>, body: DocValue) -> Self {
        Document {
            id: id.into(),
            body,
            xattrs: BTreeMap::new(),
            cas: Cas::ZERO,
            seqno: 0,
            last_modified: Timestamp::EPOCH,
            expiry: None,
        }
    }

    /// True if the document's expiry is at or before `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expiry, Some(exp) if exp <= now)
    }

    /// Get an extended attribute
    pub fn xattr(&self, name: &str) -> Option<&DocValue> {
        self.xattrs.get(name)
    }

    /// Size of the body's compact JSON encoding
    pub fn body_size(&self) -> usize {
        self.body.encoded_len()
    }

    /// Combined size of all extended attributes (names and encoded values)
    pub fn xattr_size(&self) -> usize {
        self.xattrs
            .iter()
            .map(|(name, value)| name.len() + value.encoded_len())
            .sum()
    }
}
