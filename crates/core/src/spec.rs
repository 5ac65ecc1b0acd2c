//! Sub-document operation specs and results
//!
//! A request against one document is a slice of specs. Lookups and mutations
//! are never mixed in one request:
//!
//! ```
//! use docmeta_core::{LookupSpec, MutateSpec, DocValue};
//!
//! let lookups = vec![
//!     LookupSpec::exists("discounts.jsmith123").unwrap().xattr(),
//!     LookupSpec::get("$document.exptime").unwrap().xattr(),
//! ];
//! let mutations = vec![
//!     MutateSpec::upsert("discounts.jsmith123", DocValue::Int(20))
//!         .unwrap()
//!         .xattr()
//!         .create_parents(),
//! ];
//! assert_eq!(lookups.len() + mutations.len(), 3);
//! ```

use crate::contract::{Cas, Timestamp};
use crate::error::{Error, Result};
use crate::path::SubdocPath;
use crate::value::DocValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// Namespaces and Modes
// =============================================================================

/// Which part of a document a path addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathNamespace {
    /// The main document body
    #[default]
    Body,
    /// The extended-attribute namespace
    Metadata,
}

impl PathNamespace {
    /// True for the extended-attribute namespace
    pub fn is_metadata(&self) -> bool {
        matches!(self, PathNamespace::Metadata)
    }
}

/// How a write treats an existing value at the target path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Fail with `PathExists` if a value is present
    InsertOnly,
    /// Create or overwrite
    #[default]
    Upsert,
    /// Fail with `PathNotFound` if no value is present
    Replace,
}

// =============================================================================
// Lookups
// =============================================================================

/// Lookup operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOp {
    /// Whether the path holds a value; yields `Bool`
    Exists,
    /// The value at the path
    Get,
    /// Element count of the array or object at the path; yields `Int`
    Count,
}

/// One read against one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupSpec {
    /// Operation kind
    pub op: LookupOp,
    /// Target path
    pub path: SubdocPath,
    /// Namespace the path is resolved in
    pub namespace: PathNamespace,
}

impl LookupSpec {
    /// Build a lookup from a parsed path (body namespace)
    pub fn new(op: LookupOp, path: SubdocPath) -> Self {
        LookupSpec {
            op,
            path,
            namespace: PathNamespace::Body,
        }
    }

    /// `exists` lookup
    pub fn exists(path: &str) -> Result<Self> {
        Ok(LookupSpec::new(LookupOp::Exists, path.parse()?))
    }

    /// `get` lookup
    pub fn get(path: &str) -> Result<Self> {
        Ok(LookupSpec::new(LookupOp::Get, path.parse()?))
    }

    /// `count` lookup
    pub fn count(path: &str) -> Result<Self> {
        Ok(LookupSpec::new(LookupOp::Count, path.parse()?))
    }

    /// Address the extended-attribute namespace
    pub fn xattr(mut self) -> Self {
        self.namespace = PathNamespace::Metadata;
        self
    }

    /// Set the namespace explicitly
    pub fn in_namespace(mut self, namespace: PathNamespace) -> Self {
        self.namespace = namespace;
        self
    }
}

/// Outcome of one lookup spec
///
/// A failing spec does not fail the request; its error is carried here.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecResult {
    /// Operation that produced this result
    pub op: LookupOp,
    /// Path text as addressed
    pub path: String,
    /// Value, or the per-path error
    pub outcome: Result<DocValue>,
}

/// Result of a lookup request
#[derive(Debug, Clone, PartialEq)]
pub struct LookupInResult {
    /// Document CAS at the time of the read
    pub cas: Cas,
    /// One entry per spec, in request order
    pub results: Vec<SpecResult>,
}

impl LookupInResult {
    /// Number of spec results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True if the request carried no specs
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether spec `index` found a value
    ///
    /// For an `Exists` spec this is the boolean it yielded.
    pub fn exists(&self, index: usize) -> bool {
        match self.results.get(index) {
            Some(SpecResult {
                op: LookupOp::Exists,
                outcome: Ok(v),
                ..
            }) => v.as_bool().unwrap_or(false),
            Some(SpecResult { outcome: Ok(_), .. }) => true,
            _ => false,
        }
    }

    /// Value yielded by spec `index`
    pub fn content(&self, index: usize) -> Result<&DocValue> {
        match self.results.get(index) {
            Some(SpecResult { outcome: Ok(v), .. }) => Ok(v),
            Some(SpecResult { outcome: Err(e), .. }) => Err(e.clone()),
            None => Err(Error::invalid_argument(format!(
                "no spec at index {} (request had {})",
                index,
                self.results.len()
            ))),
        }
    }

    /// Take the value yielded by spec `index`
    pub fn into_content(mut self, index: usize) -> Result<DocValue> {
        if index >= self.results.len() {
            return Err(Error::invalid_argument(format!(
                "no spec at index {} (request had {})",
                index,
                self.results.len()
            )));
        }
        self.results.swap_remove(index).outcome
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// Mutation operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutateOp {
    /// Write; fail if the path holds a value
    Insert,
    /// Write unconditionally
    Upsert,
    /// Write; fail if the path is absent
    Replace,
    /// Delete the value at the path
    Remove,
    /// Append the value to the array at the path
    ArrayAppend,
    /// Add the delta to the integer at the path
    Counter(i64),
}

impl MutateOp {
    /// Write mode of the value-writing ops
    pub fn write_mode(&self) -> Option<WriteMode> {
        match self {
            MutateOp::Insert => Some(WriteMode::InsertOnly),
            MutateOp::Upsert => Some(WriteMode::Upsert),
            MutateOp::Replace => Some(WriteMode::Replace),
            _ => None,
        }
    }
}

impl From<WriteMode> for MutateOp {
    fn from(mode: WriteMode) -> Self {
        match mode {
            WriteMode::InsertOnly => MutateOp::Insert,
            WriteMode::Upsert => MutateOp::Upsert,
            WriteMode::Replace => MutateOp::Replace,
        }
    }
}

/// Values the store substitutes when the mutation commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationMacro {
    /// CAS assigned by this mutation
    Cas,
    /// Sequence number assigned by this mutation
    SeqNo,
    /// CRC32 of the document body after this mutation
    ValueCrc32,
}

impl MutationMacro {
    /// Macro text as written in requests
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationMacro::Cas => "${Mutation.CAS}",
            MutationMacro::SeqNo => "${Mutation.seqno}",
            MutationMacro::ValueCrc32 => "${Mutation.value_crc32c}",
        }
    }

    /// Parse macro text
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "${Mutation.CAS}" => Some(MutationMacro::Cas),
            "${Mutation.seqno}" => Some(MutationMacro::SeqNo),
            "${Mutation.value_crc32c}" => Some(MutationMacro::ValueCrc32),
            _ => None,
        }
    }
}

/// Value carried by a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MutateValue {
    /// A literal value
    Value(DocValue),
    /// A value expanded by the store at commit
    Macro(MutationMacro),
}

impl From<DocValue> for MutateValue {
    fn from(v: DocValue) -> Self {
        MutateValue::Value(v)
    }
}

impl From<MutationMacro> for MutateValue {
    fn from(m: MutationMacro) -> Self {
        MutateValue::Macro(m)
    }
}

/// One write against one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutateSpec {
    /// Operation kind
    pub op: MutateOp,
    /// Target path
    pub path: SubdocPath,
    /// Value for insert/upsert/replace/append
    pub value: Option<MutateValue>,
    /// Namespace the path is resolved in
    pub namespace: PathNamespace,
    /// Create missing intermediate objects
    pub create_parents: bool,
}

impl MutateSpec {
    /// Build a mutation from a parsed path (body namespace, no parent creation)
    pub fn new(op: MutateOp, path: SubdocPath, value: Option<MutateValue>) -> Self {
        MutateSpec {
            op,
            path,
            value,
            namespace: PathNamespace::Body,
            create_parents: false,
        }
    }

    /// `insert` mutation
    pub fn insert(path: &str, value: impl Into<MutateValue>) -> Result<Self> {
        Ok(MutateSpec::new(MutateOp::Insert, path.parse()?, Some(value.into())))
    }

    /// `upsert` mutation
    pub fn upsert(path: &str, value: impl Into<MutateValue>) -> Result<Self> {
        Ok(MutateSpec::new(MutateOp::Upsert, path.parse()?, Some(value.into())))
    }

    /// `replace` mutation
    pub fn replace(path: &str, value: impl Into<MutateValue>) -> Result<Self> {
        Ok(MutateSpec::new(MutateOp::Replace, path.parse()?, Some(value.into())))
    }

    /// `remove` mutation
    pub fn remove(path: &str) -> Result<Self> {
        Ok(MutateSpec::new(MutateOp::Remove, path.parse()?, None))
    }

    /// `array_append` mutation
    pub fn array_append(path: &str, value: impl Into<MutateValue>) -> Result<Self> {
        Ok(MutateSpec::new(MutateOp::ArrayAppend, path.parse()?, Some(value.into())))
    }

    /// `counter` mutation
    pub fn counter(path: &str, delta: i64) -> Result<Self> {
        Ok(MutateSpec::new(MutateOp::Counter(delta), path.parse()?, None))
    }

    /// Address the extended-attribute namespace
    pub fn xattr(mut self) -> Self {
        self.namespace = PathNamespace::Metadata;
        self
    }

    /// Set the namespace explicitly
    pub fn in_namespace(mut self, namespace: PathNamespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Create missing intermediate objects on write
    pub fn create_parents(mut self) -> Self {
        self.create_parents = true;
        self
    }

    /// Set parent creation explicitly
    pub fn with_create_parents(mut self, create: bool) -> Self {
        self.create_parents = create;
        self
    }
}

/// Options of a mutation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutateInOptions {
    /// Reject the request unless the document's CAS matches
    pub cas: Option<Cas>,
    /// New expiry, relative to commit time
    pub expiry: Option<Duration>,
    /// Keep the current expiry instead of clearing it
    pub preserve_expiry: bool,
}

impl MutateInOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the document CAS to match
    pub fn with_cas(mut self, cas: Cas) -> Self {
        self.cas = Some(cas);
        self
    }

    /// Set the expiry
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Keep the existing expiry
    pub fn preserve_expiry(mut self) -> Self {
        self.preserve_expiry = true;
        self
    }

    /// Reject contradictory options
    pub fn validate(&self) -> Result<()> {
        if self.preserve_expiry && self.expiry.is_some() {
            return Err(Error::invalid_argument(
                "expiry and preserve_expiry are mutually exclusive",
            ));
        }
        Ok(())
    }

    /// Expiry the document carries after commit
    pub fn resolve_expiry(&self, current: Option<Timestamp>, now: Timestamp) -> Option<Timestamp> {
        match self.expiry {
            Some(ttl) => Some(now.saturating_add(ttl)),
            None if self.preserve_expiry => current,
            None => None,
        }
    }
}

/// Result of a successful mutation request
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult {
    /// CAS assigned by the mutation
    pub cas: Cas,
    /// Sequence number assigned by the mutation
    pub seqno: u64,
    /// Per-spec output; `Some` only for counters (the new value)
    pub values: Vec<Option<DocValue>>,
}
