//! Shared helpers for the engine integration suites.
//!
//! Import via `mod common;`.

#![allow(dead_code)]

use docmeta_core::{DocValue, Keyspace, Result};
use docmeta_engine::{
    Cluster, ClusterOptions, Collection, QueryEngine, QueryOptions, QueryRow, RowStream,
    StoreServer, WriteOptions,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const BUCKET: &str = "travel-sample";
pub const USER: &str = "Administrator";
pub const PASSWORD: &str = "password";
pub const DISCOUNT_PATH: &str = "discounts.jsmith123";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// An address no other test in this process uses
pub fn unique_address(prefix: &str) -> String {
    format!(
        "{}-{}-{}.test",
        prefix,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

// ============================================================================
// TestCluster - node + connected client
// ============================================================================

/// A started node with one user and the travel-sample bucket, plus a
/// client connected to it.
pub struct TestCluster {
    pub node: Arc<StoreServer>,
    pub cluster: Cluster,
    pub address: String,
}

impl TestCluster {
    pub fn new() -> Self {
        Self::with_options(ClusterOptions::new(USER, PASSWORD))
    }

    pub fn with_options(options: ClusterOptions) -> Self {
        let node = start_node("cluster");
        let address = node.address().to_string();
        let cluster = Cluster::connect(&format!("docmeta://{}", address), options)
            .expect("connect to test node");
        TestCluster {
            node,
            cluster,
            address,
        }
    }

    /// The bucket's default collection
    pub fn collection(&self) -> Collection {
        self.cluster
            .bucket(BUCKET)
            .and_then(|b| b.default_collection())
            .expect("default collection")
    }
}

/// Start a node with the test user and bucket
pub fn start_node(prefix: &str) -> Arc<StoreServer> {
    let node = StoreServer::start(&unique_address(prefix)).expect("start node");
    node.add_user(USER, PASSWORD);
    node.create_bucket(BUCKET).expect("create bucket");
    node
}

/// Create `id` with an empty body and set its discount xattr
pub fn seed_hotel(collection: &Collection, id: &str, discount: i64) {
    collection.upsert(id, DocValue::object()).unwrap();
    collection
        .write(id, DISCOUNT_PATH, discount, &WriteOptions::xattr())
        .unwrap();
}

// ============================================================================
// Query engines
// ============================================================================

/// Returns a fixed list of rows for any statement
pub struct StaticRows {
    pub rows: Vec<Result<QueryRow>>,
}

impl StaticRows {
    pub fn ids<'a>(column: &str, ids: impl IntoIterator<Item = &'a str>) -> Self {
        StaticRows {
            rows: ids
                .into_iter()
                .map(|id| Ok(QueryRow::with_id(column, id)))
                .collect(),
        }
    }
}

impl QueryEngine for StaticRows {
    fn execute(
        &self,
        _statement: &str,
        _options: &QueryOptions,
        _node: &StoreServer,
    ) -> Result<RowStream> {
        Ok(Box::new(self.rows.clone().into_iter()))
    }
}

/// Lists the ids of the default collection that start with the statement text
pub struct PrefixScan;

impl QueryEngine for PrefixScan {
    fn execute(
        &self,
        statement: &str,
        options: &QueryOptions,
        node: &StoreServer,
    ) -> Result<RowStream> {
        let store = node.collection_store(&Keyspace::default_for(BUCKET))?;
        let column = options.id_column.clone();
        let rows = store
            .scan_ids(statement)
            .into_iter()
            .map(move |id| Ok(QueryRow::with_id(&column, id)));
        Ok(Box::new(rows))
    }
}
