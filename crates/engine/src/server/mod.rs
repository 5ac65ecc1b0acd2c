//! In-process store node
//!
//! A `StoreServer` stands in for a remote document store: it owns buckets and
//! collections (each backed by a `MemoryStore`), verifies credentials,
//! counts open sessions and hands declarative statements to a pluggable
//! [`QueryEngine`]. Clients find it through the process-wide address
//! registry, the same way they would resolve a host name.
//!
//! # Example
//!
//! ```
//! use docmeta_engine::StoreServer;
//!
//! let node = StoreServer::start("docs-example.local").unwrap();
//! node.add_user("Administrator", "password");
//! node.create_bucket("travel-sample").unwrap();
//! assert_eq!(node.address(), "docs-example.local:11210");
//! ```

pub mod registry;

use crate::query::{QueryEngine, QueryOptions, RowStream};
use dashmap::DashMap;
use docmeta_core::{DocumentStore, Error, Keyspace, Result, Timestamp};
use docmeta_storage::MemoryStore;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub use registry::{normalize_address, DEFAULT_PORT};

type PasswordDigest = [u8; 32];

fn digest(password: &str) -> PasswordDigest {
    Sha256::digest(password.as_bytes()).into()
}

/// An in-process document store node
pub struct StoreServer {
    address: String,
    users: RwLock<HashMap<String, PasswordDigest>>,
    buckets: RwLock<BTreeSet<String>>,
    collections: DashMap<Keyspace, Arc<MemoryStore>>,
    query_engine: RwLock<Option<Arc<dyn QueryEngine>>>,
    online: AtomicBool,
    active_sessions: AtomicUsize,
}

impl StoreServer {
    /// Start a node and register it at `address` (`host` or `host:port`)
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if a live node already holds the address.
    pub fn start(address: &str) -> Result<Arc<Self>> {
        let address = normalize_address(address);
        let node = Arc::new(StoreServer {
            address: address.clone(),
            users: RwLock::new(HashMap::new()),
            buckets: RwLock::new(BTreeSet::new()),
            collections: DashMap::new(),
            query_engine: RwLock::new(None),
            online: AtomicBool::new(true),
            active_sessions: AtomicUsize::new(0),
        });
        if !registry::register(&address, &node) {
            return Err(Error::invalid_argument(format!(
                "address {} is already in use",
                address
            )));
        }
        tracing::debug!(target: "docmeta::store", address = %address, "store node started");
        Ok(node)
    }

    /// Normalized `host:port` address
    pub fn address(&self) -> &str {
        &self.address
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Add (or replace) a user; only a SHA-256 digest of the password is kept
    pub fn add_user(&self, username: &str, password: &str) {
        self.users
            .write()
            .insert(username.to_string(), digest(password));
    }

    /// Remove a user; open sessions are not affected
    pub fn remove_user(&self, username: &str) -> bool {
        self.users.write().remove(username).is_some()
    }

    pub(crate) fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        let users = self.users.read();
        match users.get(username) {
            Some(stored) if *stored == digest(password) => Ok(()),
            _ => Err(Error::Authentication {
                user: username.to_string(),
            }),
        }
    }

    // ========================================================================
    // Keyspaces
    // ========================================================================

    /// Create a bucket with its default collection
    ///
    /// Creating an existing bucket is a no-op.
    pub fn create_bucket(&self, name: &str) -> Result<()> {
        if name.is_empty() || name.contains('.') {
            return Err(Error::invalid_argument(format!(
                "invalid bucket name '{}'",
                name
            )));
        }
        self.buckets.write().insert(name.to_string());
        self.collections
            .entry(Keyspace::default_for(name))
            .or_insert_with(|| Arc::new(MemoryStore::new()));
        Ok(())
    }

    /// Create a collection inside an existing bucket
    pub fn create_collection(&self, keyspace: &Keyspace) -> Result<()> {
        if !self.has_bucket(&keyspace.bucket) {
            return Err(Error::KeyspaceNotFound(keyspace.bucket.clone()));
        }
        self.collections
            .entry(keyspace.clone())
            .or_insert_with(|| Arc::new(MemoryStore::new()));
        Ok(())
    }

    /// True if the bucket exists
    pub fn has_bucket(&self, name: &str) -> bool {
        self.buckets.read().contains(name)
    }

    /// Store backing a collection
    pub fn collection_store(&self, keyspace: &Keyspace) -> Result<Arc<dyn DocumentStore>> {
        self.memory_store(keyspace)
            .map(|store| store as Arc<dyn DocumentStore>)
    }

    fn memory_store(&self, keyspace: &Keyspace) -> Result<Arc<MemoryStore>> {
        self.collections
            .get(keyspace)
            .map(|store| Arc::clone(store.value()))
            .ok_or_else(|| Error::KeyspaceNotFound(keyspace.to_string()))
    }

    /// Drop expired documents in every collection
    pub fn purge_expired(&self) -> usize {
        let now = Timestamp::now();
        let stores: Vec<Arc<MemoryStore>> = self
            .collections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        stores.iter().map(|store| store.purge_expired(now)).sum()
    }

    // ========================================================================
    // Query service
    // ========================================================================

    /// Install the engine that executes declarative statements
    pub fn set_query_engine(&self, engine: Arc<dyn QueryEngine>) {
        *self.query_engine.write() = Some(engine);
    }

    /// Execute a statement on the installed engine
    ///
    /// # Errors
    ///
    /// `Query` if no engine is installed or the engine rejects the statement.
    pub fn execute_query(&self, statement: &str, options: &QueryOptions) -> Result<RowStream> {
        let engine = self
            .query_engine
            .read()
            .clone()
            .ok_or_else(|| Error::query("no query service is available on this node"))?;
        engine.execute(statement, options, self)
    }

    // ========================================================================
    // Availability and sessions
    // ========================================================================

    /// Simulate the node going down (`false`) or coming back (`true`)
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
        tracing::debug!(target: "docmeta::store", address = %self.address, online, "node availability changed");
    }

    /// True while the node accepts requests
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Number of sessions currently open against this node
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Acquire)
    }

    pub(crate) fn open_session(&self) {
        self.active_sessions.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn close_session(&self) {
        self.active_sessions.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Drop for StoreServer {
    fn drop(&mut self) {
        registry::deregister(&self.address);
    }
}

impl std::fmt::Debug for StoreServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreServer")
            .field("address", &self.address)
            .field("online", &self.is_online())
            .field("active_sessions", &self.active_sessions())
            .finish()
    }
}
