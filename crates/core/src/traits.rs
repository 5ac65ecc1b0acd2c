//! Core traits for the store abstraction
//!
//! `DocumentStore` is the seam between the client surface and whatever holds
//! the documents. The in-memory store implements it; the client only ever
//! talks to a `dyn DocumentStore`.

use std::time::Duration;

use crate::contract::{Cas, Timestamp};
use crate::error::Result;
use crate::spec::{LookupInResult, LookupSpec, MutateInOptions, MutateSpec, MutationResult};
use crate::value::DocValue;

/// Full-body read of a document
#[derive(Debug, Clone, PartialEq)]
pub struct GetResult {
    /// Document key
    pub id: String,
    /// Main body (never includes extended attributes)
    pub body: DocValue,
    /// Current CAS
    pub cas: Cas,
    /// Absolute expiry, if any
    pub expiry: Option<Timestamp>,
}

/// Document store abstraction
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads. Mutations of one document are serialized by the store;
/// a sub-document batch is applied to one document atomically.
///
/// Expired documents behave as absent for every method.
pub trait DocumentStore: Send + Sync {
    /// Read the full body of a document
    ///
    /// # Errors
    ///
    /// `DocumentNotFound` if the document is absent.
    fn get(&self, id: &str) -> Result<GetResult>;

    /// Create a document
    ///
    /// # Errors
    ///
    /// `DocumentExists` if the key is taken; `Limit` if the body is too large.
    fn insert(&self, id: &str, body: DocValue, expiry: Option<Duration>) -> Result<Cas>;

    /// Create or replace a document body
    ///
    /// Replacing a body keeps the document's extended attributes.
    fn upsert(&self, id: &str, body: DocValue, expiry: Option<Duration>) -> Result<Cas>;

    /// Delete a document and its extended attributes
    ///
    /// # Errors
    ///
    /// `DocumentNotFound` if absent; `CasMismatch` if `cas` is given and stale.
    fn remove(&self, id: &str, cas: Option<Cas>) -> Result<()>;

    /// Reset a document's expiry (`None` clears it)
    fn touch(&self, id: &str, expiry: Option<Duration>) -> Result<Cas>;

    /// Execute a batch of reads against one document
    ///
    /// Per-path failures are reported per spec; only document-level failures
    /// (absent document, too many specs) fail the whole call.
    fn lookup_in(&self, id: &str, specs: &[LookupSpec]) -> Result<LookupInResult>;

    /// Execute a batch of writes against one document atomically
    ///
    /// Specs apply in order. If any spec fails, the document is unchanged
    /// and the first failure is returned.
    fn mutate_in(
        &self,
        id: &str,
        specs: &[MutateSpec],
        options: &MutateInOptions,
    ) -> Result<MutationResult>;

    /// Keys of live documents starting with `prefix`, in ascending order
    fn scan_ids(&self, prefix: &str) -> Vec<String>;

    /// Number of live documents
    fn len(&self) -> usize;

    /// True if the store holds no live documents
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_store_is_object_safe_and_send_sync() {
        fn accepts_store(_: &dyn DocumentStore) {}
        fn assert_send<T: Send + ?Sized>() {}
        fn assert_sync<T: Sync + ?Sized>() {}

        let _ = accepts_store;
        assert_send::<dyn DocumentStore>();
        assert_sync::<dyn DocumentStore>();
    }
}
