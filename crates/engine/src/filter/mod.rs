//! Filter workflow: list ids, probe one metadata path per id, keep matches
//!
//! ## States
//!
//! ```text
//! Listing ──open listing──▶ Probing ──stream exhausted / max_results──▶ Done
//! ```
//!
//! For each listed id the workflow checks that the probe path exists, reads
//! it, applies the predicate and, on a match, fetches the full body.
//!
//! ## Failure policy
//!
//! - Per-document errors (missing document, path mismatch, ...) count as
//!   "not matched"; they are logged and the run continues.
//! - Listing errors (`Query`) and connection errors (`Unavailable`,
//!   `Authentication`) end the run and are returned unmodified.
//!
//! ## Concurrency
//!
//! With `workers <= 1` probing is strictly sequential and one `advance()`
//! probes one id. With more workers the whole stream is probed on a bounded
//! rayon pool, built once per session and worker count. Results are put back
//! into listing order when `preserve_order` is set.

pub(crate) mod pool;
mod predicate;

pub use predicate::Predicate;

use crate::collection::Collection;
use crate::query::QueryOptions;
use docmeta_core::{Cas, DocValue, Error, PathNamespace, Result, SubdocPath};
use rayon::iter::{ParallelBridge, ParallelIterator};

// =============================================================================
// Options and Inputs
// =============================================================================

/// Tuning of a filter run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// Probe workers; 0 or 1 means sequential
    pub workers: usize,
    /// Return matches in listing order
    pub preserve_order: bool,
    /// Stop after this many matches
    pub max_results: Option<usize>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            preserve_order: true,
            max_results: None,
        }
    }
}

impl FilterOptions {
    /// Sequential, order-preserving, unbounded
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set whether results keep listing order
    pub fn with_preserve_order(mut self, preserve: bool) -> Self {
        self.preserve_order = preserve;
        self
    }

    /// Stop after `max` matches
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// True when probes run on a worker pool
    pub fn is_parallel(&self) -> bool {
        self.workers > 1
    }
}

/// Where the ids to probe come from
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    /// Rows of a declarative statement; ids are read from `options.id_column`
    Query {
        /// Statement text, passed through to the query service
        statement: String,
        /// Query options
        options: QueryOptions,
    },
    /// Every live document whose id starts with `prefix`
    Scan {
        /// Id prefix (empty for all)
        prefix: String,
    },
    /// A fixed list of ids
    Ids(Vec<String>),
}

impl Listing {
    /// Query listing
    pub fn query(statement: impl Into<String>, options: QueryOptions) -> Self {
        Listing::Query {
            statement: statement.into(),
            options,
        }
    }

    /// Key-scan listing
    pub fn scan(prefix: impl Into<String>) -> Self {
        Listing::Scan {
            prefix: prefix.into(),
        }
    }

    /// Fixed id listing
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Listing::Ids(ids.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Results
// =============================================================================

/// Workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Listing not yet issued
    Listing,
    /// Consuming the listing and probing ids
    Probing,
    /// Finished; results are final
    Done,
}

/// A document that satisfied the predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredDocument {
    /// Document id
    pub id: String,
    /// Full body fetched after the match
    pub body: DocValue,
    /// Value read at the probe path
    pub value: DocValue,
    /// CAS of the body read
    pub cas: Cas,
}

/// Counters of a filter run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Ids taken from the listing
    pub listed: usize,
    /// Ids that satisfied the predicate
    pub matched: usize,
    /// Ids whose probe path was absent
    pub absent: usize,
    /// Ids whose value failed the predicate
    pub rejected: usize,
    /// Ids skipped because of a per-document error
    pub failed: usize,
}

/// Matches of a filter run, plus its counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterResultSet {
    /// Matched documents
    pub documents: Vec<FilteredDocument>,
    /// Run counters
    pub stats: FilterStats,
}

impl FilterResultSet {
    /// Number of matched documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True if nothing matched
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Matched ids, in result order
    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }

    /// Iterate over matched documents
    pub fn iter(&self) -> std::slice::Iter<'_, FilteredDocument> {
        self.documents.iter()
    }
}

impl IntoIterator for FilterResultSet {
    type Item = FilteredDocument;
    type IntoIter = std::vec::IntoIter<FilteredDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

// =============================================================================
// Probing
// =============================================================================

enum ProbeOutcome {
    Matched(FilteredDocument),
    Absent,
    Rejected,
    Failed,
}

struct Probe<'a> {
    collection: &'a Collection,
    path: &'a SubdocPath,
    namespace: PathNamespace,
    predicate: &'a Predicate,
}

impl Probe<'_> {
    fn run(&self, id: &str) -> Result<ProbeOutcome> {
        match self.evaluate(id) {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_per_document() => {
                tracing::warn!(
                    target: "docmeta::filter",
                    id,
                    path = %self.path,
                    error = %e,
                    "probe failed, treating document as not matched"
                );
                Ok(ProbeOutcome::Failed)
            }
            Err(e) => Err(e),
        }
    }

    fn evaluate(&self, id: &str) -> Result<ProbeOutcome> {
        if !self
            .collection
            .exists_at(id, self.path, self.namespace)?
        {
            return Ok(ProbeOutcome::Absent);
        }
        let value = self.collection.read_at(id, self.path, self.namespace)?;
        if !self.predicate.evaluate(&value) {
            return Ok(ProbeOutcome::Rejected);
        }
        let doc = self.collection.get(id)?;
        Ok(ProbeOutcome::Matched(FilteredDocument {
            id: id.to_string(),
            body: doc.body,
            value,
            cas: doc.cas,
        }))
    }
}

// =============================================================================
// Workflow
// =============================================================================

type IdStream = Box<dyn Iterator<Item = Result<String>> + Send>;

/// One filter run over a collection
///
/// ```no_run
/// use docmeta_engine::{Collection, Listing, Predicate};
///
/// fn discounted(collection: &Collection) -> docmeta_core::Result<Vec<String>> {
///     let results = collection
///         .filter(Listing::scan("hotel_"), "discounts.jsmith123", Predicate::greater_than(15.0))?
///         .run()?;
///     Ok(results.ids().into_iter().map(String::from).collect())
/// }
/// ```
pub struct FilterWorkflow {
    collection: Collection,
    listing: Option<Listing>,
    path: SubdocPath,
    namespace: PathNamespace,
    predicate: Predicate,
    options: FilterOptions,
    state: FilterState,
    stream: Option<IdStream>,
    next_index: usize,
    matches: Vec<(usize, FilteredDocument)>,
    stats: FilterStats,
}

impl FilterWorkflow {
    /// Prepare a run probing `path` in the extended-attribute namespace
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `path` does not parse, or if it does not start
    /// with an attribute name (the root, or a leading `[n]` index).
    pub fn new(
        collection: Collection,
        listing: Listing,
        path: &str,
        predicate: Predicate,
    ) -> Result<Self> {
        let path: SubdocPath = path.parse()?;
        path.validate()?;
        if path.first_key().is_none() {
            return Err(Error::invalid_argument(format!(
                "filter path '{}' must start with an attribute name",
                path
            )));
        }
        let options = collection.filter_defaults().clone();
        Ok(FilterWorkflow {
            collection,
            listing: Some(listing),
            path,
            namespace: PathNamespace::Metadata,
            predicate,
            options,
            state: FilterState::Listing,
            stream: None,
            next_index: 0,
            matches: Vec::new(),
            stats: FilterStats::default(),
        })
    }

    /// Replace the run options
    pub fn with_options(mut self, options: FilterOptions) -> Self {
        self.options = options;
        self
    }

    /// Probe the body namespace instead of extended attributes
    ///
    /// The path keeps the attribute-name check applied by [`FilterWorkflow::new`].
    pub fn with_namespace(mut self, namespace: PathNamespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Current state
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Counters so far
    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Options in effect
    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Perform one step and return the new state
    ///
    /// An error ends the run: the state becomes `Done` and the error is
    /// returned as raised.
    pub fn advance(&mut self) -> Result<FilterState> {
        let step = match self.state {
            FilterState::Listing => self.open_listing(),
            FilterState::Probing if self.options.is_parallel() => self.probe_all_parallel(),
            FilterState::Probing => self.probe_next(),
            FilterState::Done => Ok(()),
        };
        if let Err(e) = step {
            self.state = FilterState::Done;
            self.stream = None;
            tracing::warn!(target: "docmeta::filter", error = %e, "filter run aborted");
            return Err(e);
        }
        Ok(self.state)
    }

    /// Drive the run to completion
    pub fn run(mut self) -> Result<FilterResultSet> {
        while self.state != FilterState::Done {
            self.advance()?;
        }
        Ok(self.into_result_set())
    }

    /// Matches gathered so far, consuming the workflow
    pub fn into_result_set(mut self) -> FilterResultSet {
        if self.options.preserve_order {
            self.matches.sort_by_key(|(index, _)| *index);
        }
        let mut documents: Vec<FilteredDocument> =
            self.matches.into_iter().map(|(_, doc)| doc).collect();
        if let Some(max) = self.options.max_results {
            documents.truncate(max);
        }
        FilterResultSet {
            documents,
            stats: self.stats,
        }
    }

    fn open_listing(&mut self) -> Result<()> {
        let listing = self
            .listing
            .take()
            .ok_or_else(|| Error::Internal("filter listing already consumed".to_string()))?;

        let stream: IdStream = match listing {
            Listing::Query { statement, options } => {
                let rows = self.collection.session().query(&statement, &options)?;
                let column = options.id_column;
                Box::new(rows.map(move |row| row.and_then(|r| r.id(&column))))
            }
            Listing::Scan { prefix } => Box::new(
                self.collection
                    .scan_ids(&prefix)?
                    .into_iter()
                    .map(Ok::<String, Error>),
            ),
            Listing::Ids(ids) => Box::new(ids.into_iter().map(Ok::<String, Error>)),
        };

        tracing::debug!(
            target: "docmeta::filter",
            keyspace = %self.collection.keyspace(),
            path = %self.path,
            predicate = %self.predicate,
            workers = self.options.workers,
            "listing opened"
        );
        self.stream = Some(stream);
        self.state = FilterState::Probing;
        Ok(())
    }

    fn limit_reached(&self) -> bool {
        matches!(self.options.max_results, Some(max) if self.matches.len() >= max)
    }

    fn probe(&self) -> Probe<'_> {
        Probe {
            collection: &self.collection,
            path: &self.path,
            namespace: self.namespace,
            predicate: &self.predicate,
        }
    }

    fn probe_next(&mut self) -> Result<()> {
        if self.limit_reached() {
            self.finish();
            return Ok(());
        }
        let next = match self.stream.as_mut() {
            Some(stream) => stream.next(),
            None => None,
        };
        match next {
            None => self.finish(),
            Some(item) => {
                let id = item?;
                let index = self.next_index;
                self.next_index += 1;
                self.stats.listed += 1;
                let outcome = self.probe().run(&id)?;
                self.record(index, outcome);
            }
        }
        Ok(())
    }

    fn probe_all_parallel(&mut self) -> Result<()> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                self.finish();
                return Ok(());
            }
        };

        let pool = self
            .collection
            .session()
            .pools()
            .get_or_build(self.options.workers)?;

        let start = self.next_index;
        let probe = self.probe();
        let outcomes: Vec<(usize, ProbeOutcome)> = pool.install(|| {
            stream
                .enumerate()
                .par_bridge()
                .map(|(i, item)| -> Result<(usize, ProbeOutcome)> {
                    let id = item?;
                    Ok((start + i, probe.run(&id)?))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        self.next_index += outcomes.len();
        self.stats.listed += outcomes.len();
        for (index, outcome) in outcomes {
            self.record(index, outcome);
        }
        self.finish();
        Ok(())
    }

    fn record(&mut self, index: usize, outcome: ProbeOutcome) {
        match outcome {
            ProbeOutcome::Matched(doc) => {
                self.stats.matched += 1;
                self.matches.push((index, doc));
            }
            ProbeOutcome::Absent => self.stats.absent += 1,
            ProbeOutcome::Rejected => self.stats.rejected += 1,
            ProbeOutcome::Failed => self.stats.failed += 1,
        }
    }

    fn finish(&mut self) {
        self.state = FilterState::Done;
        self.stream = None;
        tracing::info!(
            target: "docmeta::filter",
            keyspace = %self.collection.keyspace(),
            listed = self.stats.listed,
            matched = self.stats.matched,
            absent = self.stats.absent,
            rejected = self.stats.rejected,
            failed = self.stats.failed,
            "filter run complete"
        );
    }
}

impl std::fmt::Debug for FilterWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterWorkflow")
            .field("keyspace", self.collection.keyspace())
            .field("path", &self.path)
            .field("predicate", &self.predicate)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}
