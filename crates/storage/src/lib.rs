//! Storage layer for docmeta
//!
//! This crate implements the in-memory document store that backs a store node:
//! - MemoryStore: DashMap + FxHash sharded store implementing `DocumentStore`
//! - Sub-document executor: atomic lookup and mutation batches per document
//! - Expiry index for purging expired documents
//!
//! # Concurrency
//!
//! - Reads of different documents never contend
//! - A mutation locks only the shard holding its document
//! - CAS and sequence numbers come from store-wide atomics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod sharded;
pub mod subdoc;
pub mod ttl;

pub use sharded::MemoryStore;
pub use subdoc::{apply_mutations, execute_lookups, CommitStamp};
pub use ttl::ExpiryIndex;
