//! docmeta - extended-attribute client for document stores
//!
//! docmeta reads, writes and filters the metadata that rides alongside a
//! document's body: extended attributes (xattrs) and the store's read-only
//! virtual attributes (`$document.*`).
//!
//! # Quick Start
//!
//! ```
//! use docmeta::{Cluster, ClusterOptions, PathNamespace, StoreServer, WriteOptions};
//! use docmeta::DocValue;
//!
//! let node = StoreServer::start("quick-start.local").unwrap();
//! node.add_user("Administrator", "password");
//! node.create_bucket("travel-sample").unwrap();
//!
//! let cluster = Cluster::connect(
//!     "docmeta://quick-start.local",
//!     ClusterOptions::new("Administrator", "password"),
//! )
//! .unwrap();
//! let hotels = cluster.bucket("travel-sample").unwrap().default_collection().unwrap();
//!
//! hotels.upsert("hotel_10138", DocValue::object()).unwrap();
//! hotels
//!     .write("hotel_10138", "discounts.jsmith123", 20, &WriteOptions::xattr())
//!     .unwrap();
//! let v = hotels
//!     .read("hotel_10138", "discounts.jsmith123", PathNamespace::Metadata)
//!     .unwrap();
//! assert_eq!(v, DocValue::Int(20));
//! ```
//!
//! # Architecture
//!
//! - `docmeta-core`: values, paths, sub-document specs, errors, the
//!   `DocumentStore` trait
//! - `docmeta-storage`: the in-memory sharded store and batch executor
//! - `docmeta-engine`: cluster connection, collections, filter workflow,
//!   query boundary and the in-process store node

pub use docmeta_engine::*;

pub use docmeta_core::{
    Cas, DocValue, Error, ErrorKind, Keyspace, LookupSpec, MutateInOptions, MutateSpec,
    MutationMacro, MutationResult, PathNamespace, Result, WriteMode,
};
