//! Query boundary
//!
//! The store node does not parse any query language. Declarative statements
//! are handed to a pluggable [`QueryEngine`], which returns a lazy stream of
//! rows. Every row the filter consumes must carry a document id column.

use crate::server::StoreServer;
use docmeta_core::{DocValue, Error, Result};
use std::collections::BTreeMap;

/// Default name of the id column in query rows
pub const DEFAULT_ID_COLUMN: &str = "id";

/// A single result row
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow(pub BTreeMap<String, DocValue>);

impl QueryRow {
    /// Build a row holding only an id column
    pub fn with_id(column: &str, id: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(column.to_string(), DocValue::String(id.into()));
        QueryRow(fields)
    }

    /// Get a column
    pub fn get(&self, column: &str) -> Option<&DocValue> {
        self.0.get(column)
    }

    /// The document id held in `column`
    ///
    /// # Errors
    ///
    /// `Query` if the column is absent or not a string.
    pub fn id(&self, column: &str) -> Result<String> {
        match self.0.get(column) {
            Some(DocValue::String(id)) => Ok(id.clone()),
            Some(other) => Err(Error::query(format!(
                "row column '{}' is a {}, expected a string id",
                column,
                other.type_name()
            ))),
            None => Err(Error::query(format!("row has no '{}' column", column))),
        }
    }
}

impl From<BTreeMap<String, DocValue>> for QueryRow {
    fn from(fields: BTreeMap<String, DocValue>) -> Self {
        QueryRow(fields)
    }
}

/// Lazy, finite, non-restartable row stream
pub type RowStream = Box<dyn Iterator<Item = Result<QueryRow>> + Send>;

/// Options passed with a statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Column that holds document ids
    pub id_column: String,
    /// Positional parameters (`$1`, `$2`, ...)
    pub params: Vec<DocValue>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            params: Vec::new(),
        }
    }
}

impl QueryOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different id column
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Append a positional parameter
    pub fn with_param(mut self, value: impl Into<DocValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// Executes declarative statements for a store node
///
/// Implementations receive the node so they can read its collections; they
/// must not keep a strong reference to it.
pub trait QueryEngine: Send + Sync {
    /// Start executing `statement`
    ///
    /// Errors raised before the first row are returned here; errors raised
    /// while streaming surface as `Err` items of the stream.
    fn execute(
        &self,
        statement: &str,
        options: &QueryOptions,
        node: &StoreServer,
    ) -> Result<RowStream>;
}

/// Rows returned by `Cluster::query`
pub struct QueryResult {
    rows: RowStream,
}

impl QueryResult {
    pub(crate) fn new(rows: RowStream) -> Self {
        Self { rows }
    }

    /// Collect all rows, failing on the first row error
    pub fn collect_rows(self) -> Result<Vec<QueryRow>> {
        self.rows.collect()
    }

    /// Into the underlying stream
    pub fn into_stream(self) -> RowStream {
        self.rows
    }
}

impl Iterator for QueryResult {
    type Item = Result<QueryRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl std::fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult").finish_non_exhaustive()
    }
}
