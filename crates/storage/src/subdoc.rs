//! Sub-document executor
//!
//! Runs lookup and mutation batches against a single [`Document`]. The store
//! owns locking; this module only computes.
//!
//! # Mutation commit order
//!
//! Body specs never touch extended attributes and vice versa, so a batch is
//! applied in two passes over a working copy:
//!
//! 1. body specs, in request order
//! 2. stamp the new CAS / seqno / modification time, then extended-attribute
//!    specs in request order (macros expand against the stamped state and the
//!    final body)
//!
//! Within each namespace specs still apply strictly in order, so repeated
//! writes to one path are last-write-wins. If either pass fails, the error of
//! the lowest-indexed failing spec is returned and the working copy is
//! discarded.

use docmeta_core::limits::{validate_body, validate_depth, validate_spec_count};
use docmeta_core::path::{
    append_at_path, count_at_path, increment_at_path, lookup, remove_at_path, write_at_path,
    PathOpError,
};
use docmeta_core::spec::{LookupInResult, LookupOp, LookupSpec, SpecResult};
use docmeta_core::virtual_attr::{document_object, expand_macro, is_reserved, VIRTUAL_DOCUMENT};
use docmeta_core::{
    Cas, DocValue, Document, Error, LimitError, MutateOp, MutateSpec, MutateValue, PathNamespace,
    Result, SubdocPath, Timestamp, WriteMode, MAX_XATTR_SIZE,
};
use std::collections::BTreeMap;

/// State stamped onto a document by a committing mutation
#[derive(Debug, Clone, Copy)]
pub struct CommitStamp {
    /// New CAS
    pub cas: Cas,
    /// New sequence number
    pub seqno: u64,
    /// Commit time
    pub now: Timestamp,
}

// ============================================================================
// Validation
// ============================================================================

/// Check a path's shape for its namespace
fn validate_path(path: &SubdocPath, namespace: PathNamespace) -> Result<()> {
    path.validate()?;
    if namespace.is_metadata() && path.first_key().is_none() {
        return Err(Error::invalid_argument(format!(
            "extended attribute path '{}' must start with an attribute name",
            path
        )));
    }
    Ok(())
}

fn validate_lookup(spec: &LookupSpec) -> Result<()> {
    validate_path(&spec.path, spec.namespace)
}

fn validate_mutation(spec: &MutateSpec) -> Result<()> {
    validate_path(&spec.path, spec.namespace)?;

    if spec.namespace.is_metadata() {
        if let Some(name) = spec.path.first_key() {
            if is_reserved(name) {
                return Err(Error::read_only(&spec.path));
            }
        }
    } else if spec.path.is_root() && spec.op == MutateOp::Remove {
        return Err(Error::invalid_argument(
            "cannot remove the document body root; remove the document instead",
        ));
    }

    match (&spec.op, &spec.value) {
        (MutateOp::Remove | MutateOp::Counter(_), Some(_)) => Err(Error::invalid_argument(
            format!("{:?} at '{}' takes no value", spec.op, spec.path),
        )),
        (MutateOp::Remove | MutateOp::Counter(_), None) => Ok(()),
        (_, None) => Err(Error::invalid_argument(format!(
            "{:?} at '{}' requires a value",
            spec.op, spec.path
        ))),
        (_, Some(MutateValue::Macro(_))) if !spec.namespace.is_metadata() => {
            Err(Error::invalid_argument(format!(
                "mutation macros are only valid in extended attributes ('{}')",
                spec.path
            )))
        }
        (_, Some(MutateValue::Value(v))) => Ok(validate_depth(v)?),
        (_, Some(MutateValue::Macro(_))) => Ok(()),
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// Resolve one lookup spec against a document
fn resolve_lookup(doc: &Document, spec: &LookupSpec) -> Result<DocValue> {
    validate_lookup(spec)?;
    let path = &spec.path;

    let resolved = match spec.namespace {
        PathNamespace::Body => run_lookup_op(spec.op, &doc.body, path),
        PathNamespace::Metadata => match path.first_key() {
            Some(VIRTUAL_DOCUMENT) => {
                let virtual_doc = document_object(doc);
                run_lookup_op(spec.op, &virtual_doc, &path.tail())
            }
            Some(name) if is_reserved(name) => {
                return Err(Error::invalid_argument(format!(
                    "unknown virtual attribute '{}'",
                    name
                )))
            }
            _ => {
                let xattrs = DocValue::Object(doc.xattrs.clone());
                run_lookup_op(spec.op, &xattrs, path)
            }
        },
    };

    match (spec.op, resolved) {
        (LookupOp::Exists, Err(PathOpError::NotFound | PathOpError::Mismatch { .. })) => {
            Ok(DocValue::Bool(false))
        }
        (_, other) => other.map_err(|e| e.into_error(path)),
    }
}

fn run_lookup_op(
    op: LookupOp,
    root: &DocValue,
    path: &SubdocPath,
) -> std::result::Result<DocValue, PathOpError> {
    match op {
        LookupOp::Exists => lookup(root, path).map(|_| DocValue::Bool(true)),
        LookupOp::Get => lookup(root, path).cloned(),
        LookupOp::Count => count_at_path(root, path).map(|n| DocValue::Int(n as i64)),
    }
}

/// Execute a lookup batch
///
/// Fails as a whole only when the batch itself is malformed; per-path
/// failures are carried in each [`SpecResult`].
pub fn execute_lookups(doc: &Document, specs: &[LookupSpec]) -> Result<LookupInResult> {
    if specs.is_empty() {
        return Err(Error::invalid_argument("lookup batch is empty"));
    }
    validate_spec_count(specs.len())?;

    let results = specs
        .iter()
        .map(|spec| SpecResult {
            op: spec.op,
            path: spec.path.to_string(),
            outcome: resolve_lookup(doc, spec),
        })
        .collect();

    Ok(LookupInResult {
        cas: doc.cas,
        results,
    })
}

// ============================================================================
// Mutations
// ============================================================================

/// Apply one value-level mutation to a namespace root
fn apply_to_root(
    root: &mut DocValue,
    spec: &MutateSpec,
    value: Option<DocValue>,
) -> Result<Option<DocValue>> {
    let path = &spec.path;
    let outcome = match (spec.op, value) {
        (MutateOp::Remove, _) => remove_at_path(root, path).map(|_| None),
        (MutateOp::Counter(delta), _) => {
            increment_at_path(root, path, delta, spec.create_parents).map(|n| Some(DocValue::Int(n)))
        }
        (MutateOp::ArrayAppend, Some(v)) => {
            append_at_path(root, path, vec![v], spec.create_parents).map(|_| None)
        }
        (op, Some(v)) => {
            let mode = op.write_mode().unwrap_or(WriteMode::Upsert);
            write_at_path(root, path, v, mode, spec.create_parents).map(|_| None)
        }
        (op, None) => {
            return Err(Error::invalid_argument(format!(
                "{:?} at '{}' requires a value",
                op, path
            )))
        }
    };
    outcome.map_err(|e| e.into_error(path))
}

fn literal(spec: &MutateSpec) -> Option<DocValue> {
    match &spec.value {
        Some(MutateValue::Value(v)) => Some(v.clone()),
        _ => None,
    }
}

/// Apply a mutation batch to a working copy of `doc`
///
/// On success the copy carries the new body, attributes and stamp; the
/// returned vector has one entry per spec (counter results). On failure the
/// copy must be discarded.
pub fn apply_mutations(
    doc: &mut Document,
    specs: &[MutateSpec],
    stamp: CommitStamp,
) -> Result<Vec<Option<DocValue>>> {
    if specs.is_empty() {
        return Err(Error::invalid_argument("mutation batch is empty"));
    }
    validate_spec_count(specs.len())?;
    for spec in specs {
        validate_mutation(spec)?;
    }

    let mut outputs: Vec<Option<DocValue>> = vec![None; specs.len()];
    let mut first_failure: Option<(usize, Error)> = None;

    // Pass 1: body
    for (i, spec) in specs.iter().enumerate() {
        if spec.namespace.is_metadata() {
            continue;
        }
        match apply_to_root(&mut doc.body, spec, literal(spec)) {
            Ok(out) => outputs[i] = out,
            Err(e) => {
                first_failure = Some((i, e));
                break;
            }
        }
    }

    // Pass 2: extended attributes
    doc.cas = stamp.cas;
    doc.seqno = stamp.seqno;
    doc.last_modified = stamp.now;

    let mut xattrs = DocValue::Object(std::mem::take(&mut doc.xattrs));
    for (i, spec) in specs.iter().enumerate() {
        if !spec.namespace.is_metadata() {
            continue;
        }
        if matches!(first_failure, Some((failed, _)) if failed < i) {
            break;
        }
        let value = match &spec.value {
            Some(MutateValue::Macro(m)) => Some(expand_macro(*m, doc)),
            _ => literal(spec),
        };
        match apply_to_root(&mut xattrs, spec, value) {
            Ok(out) => outputs[i] = out,
            Err(e) => {
                first_failure = Some((i, e));
                break;
            }
        }
    }
    doc.xattrs = match xattrs {
        DocValue::Object(map) => map,
        _ => BTreeMap::new(),
    };

    if let Some((_, err)) = first_failure {
        return Err(err);
    }

    validate_body(&doc.body)?;
    let xattr_size = doc.xattr_size();
    if xattr_size > MAX_XATTR_SIZE {
        return Err(LimitError::XattrTooLarge {
            size: xattr_size,
            max: MAX_XATTR_SIZE,
        }
        .into());
    }

    Ok(outputs)
}
