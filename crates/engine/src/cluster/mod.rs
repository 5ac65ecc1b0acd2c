//! Connection handle
//!
//! `Cluster::connect` resolves the hosts of a connection string against the
//! in-process address registry, authenticates against the first online node
//! and opens a session. Buckets, scopes and collections obtained from the
//! cluster share that session; it is released when `disconnect` is called
//! or the last handle drops.

pub mod connection_string;
pub(crate) mod session;

pub use connection_string::ConnectionString;

use crate::collection::Collection;
use crate::config::ClientConfig;
use crate::filter::FilterOptions;
use crate::query::{QueryOptions, QueryResult};
use crate::server::registry;
use docmeta_core::{Error, Keyspace, Result};
use session::Session;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// Options
// =============================================================================

/// Username and password presented at connect time
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// New credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Options for [`Cluster::connect`]
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Credentials
    pub credentials: Credentials,
    /// Defaults for filter runs
    pub filter: FilterOptions,
    /// Column of query rows holding the document id
    pub id_column: String,
}

impl ClusterOptions {
    /// Options with the given credentials and default filter settings
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        ClusterOptions {
            credentials: Credentials::new(username, password),
            filter: FilterOptions::default(),
            id_column: QueryOptions::default().id_column,
        }
    }

    /// Options taken from a client configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        ClusterOptions {
            credentials: Credentials::new(
                config.credentials.username.clone(),
                config.credentials.password.clone(),
            ),
            filter: FilterOptions::default()
                .with_workers(config.filter.workers)
                .with_preserve_order(config.filter.preserve_order),
            id_column: config.filter.id_column.clone(),
        }
    }

    /// Replace the filter defaults
    pub fn with_filter(mut self, filter: FilterOptions) -> Self {
        self.filter = filter;
        self
    }

    fn apply_params(&mut self, conn: &ConnectionString) -> Result<()> {
        for (key, value) in conn.params() {
            match key.as_str() {
                "workers" => {
                    self.filter.workers = value.parse().map_err(|_| {
                        Error::invalid_argument(format!("invalid workers value '{}'", value))
                    })?;
                }
                "preserve_order" => {
                    self.filter.preserve_order = value.parse().map_err(|_| {
                        Error::invalid_argument(format!(
                            "invalid preserve_order value '{}'",
                            value
                        ))
                    })?;
                }
                "id_column" if !value.is_empty() => self.id_column = value.clone(),
                "id_column" => {
                    return Err(Error::invalid_argument("id_column must not be empty"));
                }
                _ => {
                    tracing::warn!(
                        target: "docmeta::session",
                        param = %key,
                        "ignoring unknown connection string parameter"
                    );
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Cluster
// =============================================================================

/// A connected client
pub struct Cluster {
    session: Arc<Session>,
    options: ClusterOptions,
}

impl Cluster {
    /// Connect and authenticate
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: malformed connection string or parameter
    /// - `Unavailable`: no listed host is registered and online
    /// - `Authentication`: wrong username or password
    pub fn connect(connection_string: &str, options: ClusterOptions) -> Result<Cluster> {
        let conn: ConnectionString = connection_string.parse()?;
        let mut options = options;
        options.apply_params(&conn)?;

        let node = conn
            .hosts()
            .iter()
            .filter_map(|host| registry::lookup(host))
            .find(|node| node.is_online())
            .ok_or_else(|| {
                Error::unavailable(conn.hosts().join(","), "no reachable store node")
            })?;

        let session = Session::open(
            node,
            &options.credentials.username,
            &options.credentials.password,
        )?;
        Ok(Cluster {
            session: Arc::new(session),
            options,
        })
    }

    /// Connect using a loaded configuration file
    pub fn connect_with_config(config: &ClientConfig) -> Result<Cluster> {
        config.validate()?;
        Cluster::connect(&config.connection_string, ClusterOptions::from_config(config))
    }

    /// Handle to a bucket
    ///
    /// # Errors
    ///
    /// `KeyspaceNotFound` if the node has no such bucket.
    pub fn bucket(&self, name: &str) -> Result<Bucket> {
        let node = self.session.check()?;
        if !node.has_bucket(name) {
            return Err(Error::KeyspaceNotFound(name.to_string()));
        }
        Ok(Bucket {
            cluster: self.handle(),
            name: name.to_string(),
        })
    }

    /// Handle to a collection by fully qualified keyspace
    pub fn collection(&self, keyspace: &Keyspace) -> Result<Collection> {
        self.handle().collection(keyspace)
    }

    /// Run a declarative statement on the node's query service
    pub fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResult> {
        self.session
            .query(statement, options)
            .map(QueryResult::new)
    }

    /// Query options carrying the configured id column
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::default().with_id_column(self.options.id_column.clone())
    }

    /// Filter defaults in effect for this connection
    pub fn filter_options(&self) -> &FilterOptions {
        &self.options.filter
    }

    /// Session identifier, as logged
    pub fn session_id(&self) -> Uuid {
        self.session.id()
    }

    /// True until the session is released or the node goes offline
    pub fn is_connected(&self) -> bool {
        self.session.check().is_ok()
    }

    /// Release the session now
    ///
    /// Handles derived from this cluster fail with `Unavailable` afterwards.
    pub fn disconnect(self) {
        self.session.release();
    }

    fn handle(&self) -> ClusterHandle {
        ClusterHandle {
            session: Arc::clone(&self.session),
            filter: self.options.filter.clone(),
            query: self.query_options(),
        }
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("session", &self.session.id())
            .field("address", &self.session.node().address())
            .field("options", &self.options)
            .finish()
    }
}

/// What buckets and scopes keep of their cluster
#[derive(Clone)]
struct ClusterHandle {
    session: Arc<Session>,
    filter: FilterOptions,
    query: QueryOptions,
}

impl ClusterHandle {
    fn collection(&self, keyspace: &Keyspace) -> Result<Collection> {
        let store = self.session.check()?.collection_store(keyspace)?;
        Ok(Collection::new(
            Arc::clone(&self.session),
            keyspace.clone(),
            store,
            self.filter.clone(),
            self.query.clone(),
        ))
    }
}

// =============================================================================
// Bucket / Scope
// =============================================================================

/// Handle to a bucket
#[derive(Clone)]
pub struct Bucket {
    cluster: ClusterHandle,
    name: String,
}

impl Bucket {
    /// Bucket name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `_default._default` collection
    pub fn default_collection(&self) -> Result<Collection> {
        self.cluster.collection(&Keyspace::default_for(self.name.as_str()))
    }

    /// Handle to a scope of this bucket
    pub fn scope(&self, name: &str) -> Scope {
        Scope {
            cluster: self.cluster.clone(),
            bucket: self.name.clone(),
            name: name.to_string(),
        }
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).finish()
    }
}

/// Handle to a scope
#[derive(Clone)]
pub struct Scope {
    cluster: ClusterHandle,
    bucket: String,
    name: String,
}

impl Scope {
    /// Scope name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to a collection of this scope
    ///
    /// # Errors
    ///
    /// `KeyspaceNotFound` if the collection does not exist.
    pub fn collection(&self, name: &str) -> Result<Collection> {
        self.cluster.collection(&Keyspace::new(
            self.bucket.as_str(),
            self.name.as_str(),
            name,
        ))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("bucket", &self.bucket)
            .field("name", &self.name)
            .finish()
    }
}
