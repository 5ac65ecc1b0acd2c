//! Session wrapper: the in-process node, the connected client and the
//! collection commands run against.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use docmeta_core::{Cas, DocValue, Error, Keyspace, Result};
use docmeta_engine::{
    ClientConfig, Cluster, ClusterOptions, Collection, ConnectionString, FilterResultSet,
    StoreServer, WriteOptions,
};
use serde::Deserialize;

use crate::parse::{filter_options, CliAction};

/// Keyspace used when `--keyspace` is not given.
pub const DEFAULT_BUCKET: &str = "travel-sample";

/// Contents of a `--seed` file.
///
/// ```json
/// {
///   "users": { "Administrator": "password" },
///   "keyspaces": {
///     "travel-sample": {
///       "hotel_10138": { "body": { "name": "Le Clos" }, "xattrs": { "discounts": { "jsmith123": 20 } } }
///     }
///   }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: BTreeMap<String, String>,
    #[serde(default)]
    pub keyspaces: BTreeMap<String, BTreeMap<String, SeedDocument>>,
}

/// One seeded document.
#[derive(Debug, Deserialize)]
pub struct SeedDocument {
    #[serde(default = "empty_object")]
    pub body: serde_json::Value,
    #[serde(default)]
    pub xattrs: BTreeMap<String, serde_json::Value>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Seed {
    /// Read a seed file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read seed file '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse seed file '{}': {}", path.display(), e))
        })
    }
}

/// What a command produced.
pub enum Output {
    Value(DocValue),
    Bool(bool),
    Mutation { cas: Cas, seqno: u64 },
    Matches(FilterResultSet),
}

/// Holds the node alive for the lifetime of the client.
pub struct SessionState {
    _node: Arc<StoreServer>,
    cluster: Cluster,
    collection: Collection,
}

impl SessionState {
    /// Start a node at the first configured host, load the seed and connect.
    pub fn open(config: &ClientConfig, seed: &Seed, keyspace: &Keyspace) -> Result<Self> {
        let conn: ConnectionString = config.connection_string.parse()?;
        let address = conn
            .hosts()
            .first()
            .ok_or_else(|| Error::Config("connection string names no hosts".to_string()))?;
        let node = StoreServer::start(address)?;

        node.add_user(&config.credentials.username, &config.credentials.password);
        for (user, password) in &seed.users {
            node.add_user(user, password);
        }
        let mut keyspaces: Vec<Keyspace> = seed
            .keyspaces
            .keys()
            .map(|k| k.parse())
            .collect::<Result<_>>()?;
        keyspaces.push(keyspace.clone());
        for ks in &keyspaces {
            node.create_bucket(&ks.bucket)?;
            node.create_collection(ks)?;
        }

        let cluster = Cluster::connect_with_config(config)?;
        for (name, docs) in &seed.keyspaces {
            let coll = cluster.collection(&name.parse()?)?;
            for (id, doc) in docs {
                coll.upsert(id, DocValue::from(doc.body.clone()))?;
                for (xattr, value) in &doc.xattrs {
                    coll.write(id, xattr, DocValue::from(value.clone()), &WriteOptions::xattr())?;
                }
            }
        }
        tracing::debug!(target: "docmeta::cli", address = %node.address(), keyspaces = keyspaces.len(), "node seeded");

        let collection = cluster.collection(keyspace)?;
        Ok(SessionState {
            _node: node,
            cluster,
            collection,
        })
    }

    /// Execute one action against the selected collection.
    pub fn execute(&self, action: CliAction) -> Result<Output> {
        let coll = &self.collection;
        match action {
            CliAction::Get { id } => Ok(Output::Value(coll.get(&id)?.body)),
            CliAction::Read {
                id,
                path,
                namespace,
            } => Ok(Output::Value(coll.read(&id, &path, namespace)?)),
            CliAction::Exists {
                id,
                path,
                namespace,
            } => Ok(Output::Bool(coll.exists(&id, &path, namespace)?)),
            CliAction::Set {
                id,
                path,
                value,
                namespace,
                mode,
                create_parents,
            } => {
                let options = WriteOptions {
                    namespace,
                    mode,
                    create_missing_parents: create_parents,
                    cas: None,
                };
                let result = coll.write(&id, &path, value, &options)?;
                Ok(Output::Mutation {
                    cas: result.cas,
                    seqno: result.seqno,
                })
            }
            CliAction::Remove {
                id,
                path,
                namespace,
            } => {
                let result = coll.remove(&id, &path, namespace)?;
                Ok(Output::Mutation {
                    cas: result.cas,
                    seqno: result.seqno,
                })
            }
            CliAction::Filter {
                listing,
                path,
                predicate,
                workers,
                limit,
            } => {
                let options = filter_options(workers, limit, self.cluster.filter_options());
                let results = coll
                    .filter(listing, &path, predicate)?
                    .with_options(options)
                    .run()?;
                Ok(Output::Matches(results))
            }
        }
    }
}
