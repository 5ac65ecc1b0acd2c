//! Sub-document paths and path operations
//!
//! A [`SubdocPath`] addresses a location inside a document body or inside its
//! extended attributes:
//!
//! | Syntax | Meaning | Example |
//! |--------|---------|---------|
//! | `key` | Object property | `discounts` |
//! | `a.b` | Nested property | `discounts.jsmith123` |
//! | `a[n]` | Array element | `rooms[0]` |
//! | `a[-1]` | Last array element | `rooms[-1]` |
//! | `` `a.b` `` | Key containing delimiters | `` `user.name`.first `` |
//! | (empty) | Root | `` |
//!
//! Inside a quoted key a doubled backtick stands for one literal backtick.
//!
//! The free functions in this module operate on [`DocValue`] trees and report
//! failures as [`PathOpError`], which the caller turns into an [`Error`] once
//! it knows the full path text.

use crate::error::Error;
use crate::limits::{LimitError, MAX_PATH_BYTES, MAX_PATH_DEPTH};
use crate::spec::WriteMode;
use crate::value::DocValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// SubdocPath and PathSegment
// =============================================================================

/// Error type for path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Unclosed backtick quote
    #[error("unclosed quote starting at position {0}")]
    UnclosedQuote(usize),
    /// Invalid array index
    #[error("invalid array index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// Path text too long
    #[error("path is {0} bytes, maximum is {MAX_PATH_BYTES}")]
    TooLong(usize),
}

/// A segment in a sub-document path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key
    Key(String),
    /// Array index
    Index(usize),
    /// Last array element (`[-1]`)
    Last,
}

impl PathSegment {
    fn key_needs_quoting(key: &str) -> bool {
        key.is_empty() || key.contains(['.', '[', ']', '`'])
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) if PathSegment::key_needs_quoting(k) => {
                write!(f, "`{}`", k.replace('`', "``"))
            }
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Last => write!(f, "[-1]"),
        }
    }
}

/// A path into a document body or its extended attributes
///
/// # Examples
///
/// ```
/// use docmeta_core::path::SubdocPath;
///
/// let path: SubdocPath = "discounts.jsmith123".parse().unwrap();
/// assert_eq!(path, SubdocPath::root().key("discounts").key("jsmith123"));
/// assert_eq!(path.first_key(), Some("discounts"));
/// assert_eq!(path.to_string(), "discounts.jsmith123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SubdocPath {
    segments: Vec<PathSegment>,
}

impl SubdocPath {
    /// Create the root path (empty path)
    pub fn root() -> Self {
        SubdocPath {
            segments: Vec::new(),
        }
    }

    /// Create a path from a vector of segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        SubdocPath { segments }
    }

    /// Get the path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root path
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True for the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a key segment (builder pattern)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// Append an index segment (builder pattern)
    pub fn index(mut self, idx: usize) -> Self {
        self.segments.push(PathSegment::Index(idx));
        self
    }

    /// Append a last-element segment (builder pattern)
    pub fn last(mut self) -> Self {
        self.segments.push(PathSegment::Last);
        self
    }

    /// Parent path (None for root)
    pub fn parent(&self) -> Option<SubdocPath> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent = self.clone();
            parent.segments.pop();
            Some(parent)
        }
    }

    /// The first segment if it is a key
    ///
    /// For extended-attribute paths this is the attribute name.
    pub fn first_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// The path with its first segment removed
    pub fn tail(&self) -> SubdocPath {
        SubdocPath::from_segments(self.segments.iter().skip(1).cloned().collect())
    }

    /// Validate the segment-count limit
    pub fn validate(&self) -> Result<(), LimitError> {
        let depth = self.segments.len();
        if depth > MAX_PATH_DEPTH {
            return Err(LimitError::PathTooDeep {
                depth,
                max: MAX_PATH_DEPTH,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Prev {
    Start,
    Dot,
    Segment,
}

impl FromStr for SubdocPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_PATH_BYTES {
            return Err(PathParseError::TooLong(s.len()));
        }
        if s.is_empty() {
            return Ok(SubdocPath::root());
        }

        let chars: Vec<char> = s.chars().collect();
        let mut segments = Vec::new();
        let mut prev = Prev::Start;
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    if prev == Prev::Dot {
                        return Err(PathParseError::EmptyKey(i));
                    }
                    prev = Prev::Dot;
                    i += 1;
                }
                '[' => {
                    if prev == Prev::Dot {
                        return Err(PathParseError::UnexpectedChar('[', i));
                    }
                    let start = i;
                    i += 1;
                    let idx_start = i;
                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    if i >= chars.len() {
                        return Err(PathParseError::UnclosedBracket(start));
                    }
                    let idx_str: String = chars[idx_start..i].iter().collect();
                    let segment = if idx_str == "-1" {
                        PathSegment::Last
                    } else {
                        let idx = idx_str
                            .parse::<usize>()
                            .map_err(|_| PathParseError::InvalidIndex(idx_start, idx_str))?;
                        PathSegment::Index(idx)
                    };
                    segments.push(segment);
                    prev = Prev::Segment;
                    i += 1;
                }
                '`' => {
                    if prev == Prev::Segment {
                        return Err(PathParseError::UnexpectedChar('`', i));
                    }
                    let start = i;
                    i += 1;
                    let mut key = String::new();
                    loop {
                        if i >= chars.len() {
                            return Err(PathParseError::UnclosedQuote(start));
                        }
                        if chars[i] == '`' {
                            if i + 1 < chars.len() && chars[i + 1] == '`' {
                                key.push('`');
                                i += 2;
                                continue;
                            }
                            i += 1;
                            break;
                        }
                        key.push(chars[i]);
                        i += 1;
                    }
                    if key.is_empty() {
                        return Err(PathParseError::EmptyKey(start));
                    }
                    segments.push(PathSegment::Key(key));
                    prev = Prev::Segment;
                }
                ']' => return Err(PathParseError::UnexpectedChar(']', i)),
                _ => {
                    if prev == Prev::Segment {
                        return Err(PathParseError::UnexpectedChar(chars[i], i));
                    }
                    let key_start = i;
                    while i < chars.len() && !matches!(chars[i], '.' | '[' | ']' | '`') {
                        i += 1;
                    }
                    let key: String = chars[key_start..i].iter().collect();
                    segments.push(PathSegment::Key(key));
                    prev = Prev::Segment;
                }
            }
        }

        if prev == Prev::Dot {
            return Err(PathParseError::EmptyKey(chars.len()));
        }

        Ok(SubdocPath { segments })
    }
}

impl fmt::Display for SubdocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 && matches!(seg, PathSegment::Key(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

// =============================================================================
// Path Operation Errors
// =============================================================================

/// Failure of a path operation, before it is tied to a path string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathOpError {
    /// Path (or an intermediate segment) is absent
    #[error("path not found")]
    NotFound,
    /// Path already holds a value
    #[error("path exists")]
    Exists,
    /// Traversal hit a value of the wrong type
    #[error("type mismatch: expected {expected}, found {found}")]
    Mismatch {
        /// Expected type
        expected: &'static str,
        /// Actual type found
        found: &'static str,
    },
    /// Arithmetic overflow in a counter operation
    #[error("counter overflow")]
    Overflow,
}

impl PathOpError {
    /// Attach the full path text and convert to the crate error type
    pub fn into_error(self, path: &dyn fmt::Display) -> Error {
        match self {
            PathOpError::NotFound => Error::path_not_found(path),
            PathOpError::Exists => Error::path_exists(path),
            PathOpError::Mismatch { expected, found } => Error::PathMismatch {
                path: path.to_string(),
                expected,
                found,
            },
            PathOpError::Overflow => {
                Error::invalid_argument(format!("counter at {} would overflow", path))
            }
        }
    }
}

fn mismatch(expected: &'static str, found: &DocValue) -> PathOpError {
    PathOpError::Mismatch {
        expected,
        found: found.type_name(),
    }
}

// =============================================================================
// Path Reads
// =============================================================================

/// Resolve a path, distinguishing absent paths from type mismatches
pub fn lookup<'a>(value: &'a DocValue, path: &SubdocPath) -> Result<&'a DocValue, PathOpError> {
    let mut current = value;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), DocValue::Object(obj)) => {
                obj.get(key).ok_or(PathOpError::NotFound)?
            }
            (PathSegment::Index(idx), DocValue::Array(arr)) => {
                arr.get(*idx).ok_or(PathOpError::NotFound)?
            }
            (PathSegment::Last, DocValue::Array(arr)) => arr.last().ok_or(PathOpError::NotFound)?,
            (PathSegment::Key(_), other) => return Err(mismatch("object", other)),
            (_, other) => return Err(mismatch("array", other)),
        };
    }
    Ok(current)
}

/// Get value at path, `None` if absent or mismatched
///
/// ```
/// use docmeta_core::{DocValue, SubdocPath};
/// use docmeta_core::path::get_at_path;
///
/// let doc: DocValue = r#"{"rooms": [{"size": 20}, {"size": 30}]}"#.parse().unwrap();
/// let path: SubdocPath = "rooms[-1].size".parse().unwrap();
/// assert_eq!(get_at_path(&doc, &path), Some(&DocValue::Int(30)));
/// ```
pub fn get_at_path<'a>(value: &'a DocValue, path: &SubdocPath) -> Option<&'a DocValue> {
    lookup(value, path).ok()
}

/// Mutable resolve of an existing path
pub fn lookup_mut<'a>(
    value: &'a mut DocValue,
    path: &SubdocPath,
) -> Result<&'a mut DocValue, PathOpError> {
    let mut current = value;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), DocValue::Object(obj)) => {
                obj.get_mut(key).ok_or(PathOpError::NotFound)?
            }
            (PathSegment::Index(idx), DocValue::Array(arr)) => {
                arr.get_mut(*idx).ok_or(PathOpError::NotFound)?
            }
            (PathSegment::Last, DocValue::Array(arr)) => {
                arr.last_mut().ok_or(PathOpError::NotFound)?
            }
            (PathSegment::Key(_), other) => return Err(mismatch("object", other)),
            (_, other) => return Err(mismatch("array", other)),
        };
    }
    Ok(current)
}

/// Number of elements of the array or object at path
pub fn count_at_path(value: &DocValue, path: &SubdocPath) -> Result<usize, PathOpError> {
    match lookup(value, path)? {
        DocValue::Array(arr) => Ok(arr.len()),
        DocValue::Object(obj) => Ok(obj.len()),
        other => Err(mismatch("array or object", other)),
    }
}

// =============================================================================
// Path Mutation
// =============================================================================

/// Navigate to the container that holds the last segment of `path`
///
/// With `create_parents`, missing intermediate keys are created as empty
/// objects when the following segment is a key. Array elements are never
/// created implicitly.
fn parent_container<'a>(
    root: &'a mut DocValue,
    path: &SubdocPath,
    create_parents: bool,
) -> Result<&'a mut DocValue, PathOpError> {
    let segments = path.segments();
    let parent_segments = &segments[..segments.len().saturating_sub(1)];
    let mut current = root;

    for (i, segment) in parent_segments.iter().enumerate() {
        let next_is_key = matches!(segments[i + 1], PathSegment::Key(_));
        current = match (segment, current) {
            (PathSegment::Key(key), DocValue::Object(obj)) => {
                if !obj.contains_key(key) {
                    if !(create_parents && next_is_key) {
                        return Err(PathOpError::NotFound);
                    }
                    obj.insert(key.clone(), DocValue::Object(BTreeMap::new()));
                }
                obj.get_mut(key).ok_or(PathOpError::NotFound)?
            }
            (PathSegment::Index(idx), DocValue::Array(arr)) => {
                arr.get_mut(*idx).ok_or(PathOpError::NotFound)?
            }
            (PathSegment::Last, DocValue::Array(arr)) => {
                arr.last_mut().ok_or(PathOpError::NotFound)?
            }
            (PathSegment::Key(_), other) => return Err(mismatch("object", other)),
            (_, other) => return Err(mismatch("array", other)),
        };
    }
    Ok(current)
}

/// Write value at path according to `mode`
///
/// - `InsertOnly`: fails with `Exists` if the path holds a value
/// - `Upsert`: creates or overwrites
/// - `Replace`: fails with `NotFound` if the path is absent
///
/// Writing the root path replaces the whole value (`InsertOnly` on root is
/// always `Exists`).
///
/// ```
/// use docmeta_core::{DocValue, SubdocPath, WriteMode};
/// use docmeta_core::path::{get_at_path, write_at_path};
///
/// let mut doc = DocValue::object();
/// let path: SubdocPath = "discounts.jsmith123".parse().unwrap();
/// write_at_path(&mut doc, &path, DocValue::Int(20), WriteMode::Upsert, true).unwrap();
/// assert_eq!(get_at_path(&doc, &path), Some(&DocValue::Int(20)));
/// ```
pub fn write_at_path(
    root: &mut DocValue,
    path: &SubdocPath,
    value: DocValue,
    mode: WriteMode,
    create_parents: bool,
) -> Result<(), PathOpError> {
    let last_segment = match path.segments().last() {
        Some(seg) => seg,
        None => {
            return match mode {
                WriteMode::InsertOnly => Err(PathOpError::Exists),
                WriteMode::Upsert | WriteMode::Replace => {
                    *root = value;
                    Ok(())
                }
            };
        }
    };

    let parent = parent_container(root, path, create_parents)?;

    match (last_segment, parent) {
        (PathSegment::Key(key), DocValue::Object(obj)) => {
            let present = obj.contains_key(key);
            match (mode, present) {
                (WriteMode::InsertOnly, true) => Err(PathOpError::Exists),
                (WriteMode::Replace, false) => Err(PathOpError::NotFound),
                _ => {
                    obj.insert(key.clone(), value);
                    Ok(())
                }
            }
        }
        (PathSegment::Index(idx), DocValue::Array(arr)) => {
            let idx = *idx;
            if idx < arr.len() {
                if mode == WriteMode::InsertOnly {
                    return Err(PathOpError::Exists);
                }
                arr[idx] = value;
                Ok(())
            } else if idx == arr.len() && mode != WriteMode::Replace {
                arr.push(value);
                Ok(())
            } else {
                Err(PathOpError::NotFound)
            }
        }
        (PathSegment::Last, DocValue::Array(arr)) => match arr.last_mut() {
            Some(_) if mode == WriteMode::InsertOnly => Err(PathOpError::Exists),
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(PathOpError::NotFound),
        },
        (PathSegment::Key(_), other) => Err(mismatch("object", other)),
        (_, other) => Err(mismatch("array", other)),
    }
}

/// Remove value at path, returning the removed value
///
/// Array removal shifts later elements down. The root cannot be removed.
pub fn remove_at_path(root: &mut DocValue, path: &SubdocPath) -> Result<DocValue, PathOpError> {
    let last_segment = path.segments().last().ok_or(PathOpError::NotFound)?;
    let parent = parent_container(root, path, false)?;

    match (last_segment, parent) {
        (PathSegment::Key(key), DocValue::Object(obj)) => {
            obj.remove(key).ok_or(PathOpError::NotFound)
        }
        (PathSegment::Index(idx), DocValue::Array(arr)) => {
            if *idx < arr.len() {
                Ok(arr.remove(*idx))
            } else {
                Err(PathOpError::NotFound)
            }
        }
        (PathSegment::Last, DocValue::Array(arr)) => arr.pop().ok_or(PathOpError::NotFound),
        (PathSegment::Key(_), other) => Err(mismatch("object", other)),
        (_, other) => Err(mismatch("array", other)),
    }
}

/// Append values to the array at path
///
/// A missing array is created when its parent exists (or `create_parents`).
pub fn append_at_path(
    root: &mut DocValue,
    path: &SubdocPath,
    values: Vec<DocValue>,
    create_parents: bool,
) -> Result<(), PathOpError> {
    match lookup_mut(root, path) {
        Ok(DocValue::Array(arr)) => {
            arr.extend(values);
            Ok(())
        }
        Ok(other) => Err(mismatch("array", other)),
        Err(PathOpError::NotFound) => write_at_path(
            root,
            path,
            DocValue::Array(values),
            WriteMode::InsertOnly,
            create_parents,
        ),
        Err(e) => Err(e),
    }
}

/// Add `delta` to the integer at path and return the new value
///
/// A missing counter starts from zero.
pub fn increment_at_path(
    root: &mut DocValue,
    path: &SubdocPath,
    delta: i64,
    create_parents: bool,
) -> Result<i64, PathOpError> {
    match lookup_mut(root, path) {
        Ok(DocValue::Int(current)) => {
            let next = current.checked_add(delta).ok_or(PathOpError::Overflow)?;
            *current = next;
            Ok(next)
        }
        Ok(other) => Err(mismatch("integer", other)),
        Err(PathOpError::NotFound) => {
            write_at_path(
                root,
                path,
                DocValue::Int(delta),
                WriteMode::InsertOnly,
                create_parents,
            )?;
            Ok(delta)
        }
        Err(e) => Err(e),
    }
}
