//! Core types and traits for docmeta
//!
//! This crate defines the foundational types used throughout the system:
//! - DocValue: Tagged value type for document bodies and attributes
//! - SubdocPath: Path into a document body or its extended attributes
//! - LookupSpec / MutateSpec: Single-document sub-document operations
//! - Document: Stored document record (body, xattrs, CAS, expiry)
//! - Virtual attributes: Store-computed `$document` fields
//! - Error: Error type hierarchy
//! - Traits: DocumentStore, the seam between client and store
//! - Contract types: Cas, Timestamp, Keyspace

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod document;
pub mod error;
pub mod limits;
pub mod path;
pub mod spec;
pub mod traits;
pub mod types;
pub mod value;
pub mod virtual_attr;

pub use contract::{Cas, Timestamp};
pub use document::Document;
pub use error::{Error, ErrorKind, Result};
pub use limits::{
    LimitError, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH, MAX_PATH_BYTES, MAX_PATH_DEPTH,
    MAX_SPECS_PER_REQUEST, MAX_XATTR_SIZE,
};
pub use path::{PathParseError, PathSegment, SubdocPath};
pub use spec::{
    LookupInResult, LookupOp, LookupSpec, MutateInOptions, MutateOp, MutateSpec, MutateValue,
    MutationMacro, MutationResult, PathNamespace, SpecResult, WriteMode,
};
pub use traits::{DocumentStore, GetResult};
pub use types::Keyspace;
pub use value::DocValue;
pub use virtual_attr::{VirtualAttr, VIRTUAL_DOCUMENT};
