//! Client engine for docmeta
//!
//! This crate is what applications talk to:
//! - Cluster: connection string parsing, authentication, session lifetime
//! - Collection: key-value and sub-document access (body and xattrs)
//! - Filter: list ids, probe one metadata path, keep predicate matches
//! - Query: the boundary to a pluggable statement engine
//! - Server: the in-process store node clients connect to
//!
//! # Example
//!
//! ```
//! use docmeta_engine::{Cluster, ClusterOptions, Listing, Predicate, StoreServer, WriteOptions};
//! use docmeta_core::DocValue;
//!
//! let node = StoreServer::start("crate-doc.local").unwrap();
//! node.add_user("Administrator", "password");
//! node.create_bucket("travel-sample").unwrap();
//!
//! let cluster = Cluster::connect(
//!     "docmeta://crate-doc.local",
//!     ClusterOptions::new("Administrator", "password"),
//! )
//! .unwrap();
//! let hotels = cluster.bucket("travel-sample").unwrap().default_collection().unwrap();
//!
//! hotels.upsert("hotel_10138", DocValue::object()).unwrap();
//! hotels
//!     .write("hotel_10138", "discounts.jsmith123", 20, &WriteOptions::xattr())
//!     .unwrap();
//!
//! let matches = hotels
//!     .filter(Listing::scan("hotel_"), "discounts.jsmith123", Predicate::greater_than(15.0))
//!     .unwrap()
//!     .run()
//!     .unwrap();
//! assert_eq!(matches.ids(), vec!["hotel_10138"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod collection;
pub mod config;
pub mod filter;
pub mod query;
pub mod server;

pub use cluster::{Bucket, Cluster, ClusterOptions, ConnectionString, Credentials, Scope};
pub use collection::{Collection, WriteOptions};
pub use config::{ClientConfig, CONFIG_FILE_NAME};
pub use filter::{
    FilterOptions, FilterResultSet, FilterState, FilterStats, FilterWorkflow, FilteredDocument,
    Listing, Predicate,
};
pub use query::{QueryEngine, QueryOptions, QueryResult, QueryRow, RowStream};
pub use server::StoreServer;
