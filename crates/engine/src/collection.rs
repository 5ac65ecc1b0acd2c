//! Collection handle: key-value and sub-document access to one keyspace
//!
//! A `Collection` shares the session of the `Cluster` it came from. Every
//! operation first checks that the session is still usable, so a collection
//! outliving `disconnect` or a node outage fails with `Unavailable` instead
//! of silently reaching the store.

use crate::cluster::session::Session;
use crate::filter::{FilterOptions, FilterWorkflow, Listing, Predicate};
use crate::query::QueryOptions;
use docmeta_core::{
    Cas, DocValue, DocumentStore, GetResult, Keyspace, LookupInResult, LookupOp, LookupSpec,
    MutateInOptions, MutateOp, MutateSpec, MutateValue, MutationResult, PathNamespace, Result,
    SubdocPath, WriteMode,
};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Write Options
// =============================================================================

/// Options of a single-path write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Namespace the path is resolved in
    pub namespace: PathNamespace,
    /// Insert-only, upsert or replace
    pub mode: WriteMode,
    /// Create missing intermediate objects
    pub create_missing_parents: bool,
    /// Reject the write unless the document CAS matches
    pub cas: Option<Cas>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::xattr()
    }
}

impl WriteOptions {
    /// Upsert into the extended-attribute namespace, creating parents
    pub fn xattr() -> Self {
        WriteOptions {
            namespace: PathNamespace::Metadata,
            mode: WriteMode::Upsert,
            create_missing_parents: true,
            cas: None,
        }
    }

    /// Upsert into the document body, creating parents
    pub fn body() -> Self {
        WriteOptions {
            namespace: PathNamespace::Body,
            ..Self::xattr()
        }
    }

    /// Set the write mode
    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fail with `PathExists` if the path already holds a value
    pub fn insert_only(self) -> Self {
        self.with_mode(WriteMode::InsertOnly)
    }

    /// Whether missing intermediate objects are created
    pub fn create_missing_parents(mut self, create: bool) -> Self {
        self.create_missing_parents = create;
        self
    }

    /// Require the document CAS to match
    pub fn with_cas(mut self, cas: Cas) -> Self {
        self.cas = Some(cas);
        self
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Handle to one collection of a bucket
#[derive(Clone)]
pub struct Collection {
    session: Arc<Session>,
    keyspace: Keyspace,
    store: Arc<dyn DocumentStore>,
    filter_defaults: FilterOptions,
    query_defaults: QueryOptions,
}

impl Collection {
    pub(crate) fn new(
        session: Arc<Session>,
        keyspace: Keyspace,
        store: Arc<dyn DocumentStore>,
        filter_defaults: FilterOptions,
        query_defaults: QueryOptions,
    ) -> Self {
        Collection {
            session,
            keyspace,
            store,
            filter_defaults,
            query_defaults,
        }
    }

    /// Fully qualified keyspace
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Query options used by listings started from this collection
    pub fn query_options(&self) -> &QueryOptions {
        &self.query_defaults
    }

    /// Filter options new workflows start with
    pub fn filter_defaults(&self) -> &FilterOptions {
        &self.filter_defaults
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    fn store(&self) -> Result<&dyn DocumentStore> {
        self.session.check()?;
        Ok(self.store.as_ref())
    }

    // ========================================================================
    // Sub-document accessors
    // ========================================================================

    /// Whether `path` holds a value in document `id`
    ///
    /// A missing path (or one that crosses a non-container) yields `false`.
    ///
    /// # Errors
    ///
    /// `DocumentNotFound` if the document is absent.
    pub fn exists(&self, id: &str, path: &str, namespace: PathNamespace) -> Result<bool> {
        self.exists_at(id, &path.parse()?, namespace)
    }

    /// Value at `path` in document `id`
    ///
    /// Virtual attributes (`$document.*`) are readable in the metadata
    /// namespace without ever being written.
    ///
    /// # Errors
    ///
    /// `PathNotFound` if absent; `DocumentNotFound` if the document is absent.
    pub fn read(&self, id: &str, path: &str, namespace: PathNamespace) -> Result<DocValue> {
        self.read_at(id, &path.parse()?, namespace)
    }

    pub(crate) fn exists_at(
        &self,
        id: &str,
        path: &SubdocPath,
        namespace: PathNamespace,
    ) -> Result<bool> {
        let spec = LookupSpec::new(LookupOp::Exists, path.clone()).in_namespace(namespace);
        let found = self.store()?.lookup_in(id, &[spec])?.into_content(0)?;
        Ok(found.as_bool().unwrap_or(false))
    }

    pub(crate) fn read_at(
        &self,
        id: &str,
        path: &SubdocPath,
        namespace: PathNamespace,
    ) -> Result<DocValue> {
        let spec = LookupSpec::new(LookupOp::Get, path.clone()).in_namespace(namespace);
        self.store()?.lookup_in(id, &[spec])?.into_content(0)
    }

    /// Write `value` at `path` in document `id`
    ///
    /// # Errors
    ///
    /// `PathExists` (insert-only), `PathNotFound` (replace, or a missing
    /// parent without `create_missing_parents`), `ReadOnlyField` for
    /// virtual attributes, `CasMismatch` if `options.cas` is stale.
    pub fn write(
        &self,
        id: &str,
        path: &str,
        value: impl Into<DocValue>,
        options: &WriteOptions,
    ) -> Result<MutationResult> {
        let spec = MutateSpec::new(
            MutateOp::from(options.mode),
            path.parse()?,
            Some(MutateValue::Value(value.into())),
        )
        .in_namespace(options.namespace)
        .with_create_parents(options.create_missing_parents);
        let mut mutate_options = MutateInOptions::new().preserve_expiry();
        if let Some(cas) = options.cas {
            mutate_options = mutate_options.with_cas(cas);
        }
        self.store()?.mutate_in(id, &[spec], &mutate_options)
    }

    /// Remove the value at `path` in document `id`
    ///
    /// # Errors
    ///
    /// `PathNotFound` if absent; `ReadOnlyField` for virtual attributes.
    pub fn remove(&self, id: &str, path: &str, namespace: PathNamespace) -> Result<MutationResult> {
        let spec = MutateSpec::new(MutateOp::Remove, path.parse()?, None).in_namespace(namespace);
        self.store()?
            .mutate_in(id, &[spec], &MutateInOptions::new().preserve_expiry())
    }

    /// Batched reads against one document; per-spec failures are reported
    /// in the result
    pub fn lookup_in(&self, id: &str, specs: &[LookupSpec]) -> Result<LookupInResult> {
        self.store()?.lookup_in(id, specs)
    }

    /// Batched writes applied atomically to one document
    pub fn mutate_in(
        &self,
        id: &str,
        specs: &[MutateSpec],
        options: &MutateInOptions,
    ) -> Result<MutationResult> {
        self.store()?.mutate_in(id, specs, options)
    }

    // ========================================================================
    // Whole-document operations
    // ========================================================================

    /// Read the full body
    pub fn get(&self, id: &str) -> Result<GetResult> {
        self.store()?.get(id)
    }

    /// Create a document; `DocumentExists` if the id is taken
    pub fn insert(&self, id: &str, body: impl Into<DocValue>) -> Result<Cas> {
        self.store()?.insert(id, body.into(), None)
    }

    /// Create or replace a document body, keeping its extended attributes
    pub fn upsert(&self, id: &str, body: impl Into<DocValue>) -> Result<Cas> {
        self.store()?.upsert(id, body.into(), None)
    }

    /// [`Collection::upsert`] with an expiry relative to now
    pub fn upsert_with_expiry(
        &self,
        id: &str,
        body: impl Into<DocValue>,
        expiry: Duration,
    ) -> Result<Cas> {
        self.store()?.upsert(id, body.into(), Some(expiry))
    }

    /// Delete a document and its extended attributes
    pub fn remove_document(&self, id: &str, cas: Option<Cas>) -> Result<()> {
        self.store()?.remove(id, cas)
    }

    /// Reset a document's expiry (`None` clears it)
    pub fn touch(&self, id: &str, expiry: Option<Duration>) -> Result<Cas> {
        self.store()?.touch(id, expiry)
    }

    /// Ids of live documents starting with `prefix`, ascending
    pub fn scan_ids(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.store()?.scan_ids(prefix))
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    /// Prepare a filter run probing the metadata `path` of every listed id
    pub fn filter(&self, listing: Listing, path: &str, predicate: Predicate) -> Result<FilterWorkflow> {
        FilterWorkflow::new(self.clone(), listing, path, predicate)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("keyspace", &self.keyspace)
            .field("session", &self.session.id())
            .finish()
    }
}
