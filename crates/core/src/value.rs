//! Tagged value type for document bodies and extended attributes
//!
//! `DocValue` is the single value model of the client. Reads return it, writes
//! take it, predicates inspect it. It serializes as plain JSON (untagged).
//!
//! ## Type Rules
//!
//! - `Int(1) != Float(1.0)`: different variants are never equal
//! - Float uses IEEE-754 equality: `NaN != NaN`
//! - Numeric comparison across Int/Float goes through [`DocValue::as_number`]
//! - Non-finite floats encode as JSON `null`
//! - Objects keep keys sorted, so encodings are deterministic

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tagged document value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    /// JSON null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Array of values
    Array(Vec<DocValue>),
    /// Object with sorted string keys
    Object(BTreeMap<String, DocValue>),
}

impl PartialEq for DocValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DocValue::Null, DocValue::Null) => true,
            (DocValue::Bool(a), DocValue::Bool(b)) => a == b,
            (DocValue::Int(a), DocValue::Int(b)) => a == b,
            (DocValue::Float(a), DocValue::Float(b)) => a == b,
            (DocValue::String(a), DocValue::String(b)) => a == b,
            (DocValue::Array(a), DocValue::Array(b)) => a == b,
            (DocValue::Object(a), DocValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl DocValue {
    /// Create an empty object
    pub fn object() -> Self {
        DocValue::Object(BTreeMap::new())
    }

    /// Create an empty array
    pub fn array() -> Self {
        DocValue::Array(Vec::new())
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DocValue::Null => "null",
            DocValue::Bool(_) => "boolean",
            DocValue::Int(_) | DocValue::Float(_) => "number",
            DocValue::String(_) => "string",
            DocValue::Array(_) => "array",
            DocValue::Object(_) => "object",
        }
    }

    /// Check if this is null
    pub fn is_null(&self) -> bool {
        matches!(self, DocValue::Null)
    }

    /// Check if this is an object
    pub fn is_object(&self) -> bool {
        matches!(self, DocValue::Object(_))
    }

    /// Check if this is an array
    pub fn is_array(&self) -> bool {
        matches!(self, DocValue::Array(_))
    }

    /// Check if this is a number (Int or Float)
    pub fn is_number(&self) -> bool {
        matches!(self, DocValue::Int(_) | DocValue::Float(_))
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DocValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 (Int only)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DocValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 (Float only)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DocValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric view of Int or Float
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DocValue::Int(i) => Some(*i as f64),
            DocValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array slice
    pub fn as_array(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as object map
    pub fn as_object(&self) -> Option<&BTreeMap<String, DocValue>> {
        match self {
            DocValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up a key of an object
    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.as_object().and_then(|o| o.get(key))
    }

    /// Compare numerically against `rhs`
    ///
    /// Returns `None` for non-numeric values and for NaN.
    pub fn compare_number(&self, rhs: f64) -> Option<Ordering> {
        self.as_number().and_then(|n| n.partial_cmp(&rhs))
    }

    /// Length of the compact JSON encoding in bytes
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }

    /// Compact JSON encoding
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Pretty JSON encoding
    pub fn to_json_string_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json_string())
    }

    /// Maximum nesting depth; scalars are 0
    pub fn nesting_depth(&self) -> usize {
        match self {
            DocValue::Array(arr) => 1 + arr.iter().map(DocValue::nesting_depth).max().unwrap_or(0),
            DocValue::Object(obj) => 1 + obj.values().map(DocValue::nesting_depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}

impl FromStr for DocValue {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for DocValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_string())
    }
}

impl From<serde_json::Value> for DocValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DocValue::Null,
            serde_json::Value::Bool(b) => DocValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => DocValue::Int(i),
                None => DocValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => DocValue::String(s),
            serde_json::Value::Array(a) => DocValue::Array(a.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(o) => {
                DocValue::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<DocValue> for serde_json::Value {
    fn from(value: DocValue) -> Self {
        match value {
            DocValue::Null => serde_json::Value::Null,
            DocValue::Bool(b) => serde_json::Value::Bool(b),
            DocValue::Int(i) => serde_json::Value::from(i),
            DocValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            DocValue::String(s) => serde_json::Value::String(s),
            DocValue::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            DocValue::Object(o) => {
                serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<bool> for DocValue {
    fn from(b: bool) -> Self {
        DocValue::Bool(b)
    }
}

impl From<i64> for DocValue {
    fn from(i: i64) -> Self {
        DocValue::Int(i)
    }
}

impl From<i32> for DocValue {
    fn from(i: i32) -> Self {
        DocValue::Int(i as i64)
    }
}

impl From<u32> for DocValue {
    fn from(i: u32) -> Self {
        DocValue::Int(i as i64)
    }
}

impl From<f64> for DocValue {
    fn from(f: f64) -> Self {
        DocValue::Float(f)
    }
}

impl From<&str> for DocValue {
    fn from(s: &str) -> Self {
        DocValue::String(s.to_string())
    }
}

impl From<String> for DocValue {
    fn from(s: String) -> Self {
        DocValue::String(s)
    }
}

impl<T: Into<DocValue>> From<Vec<T>> for DocValue {
    fn from(v: Vec<T>) -> Self {
        DocValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<DocValue>> From<Option<T>> for DocValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DocValue::Null)
    }
}

impl From<BTreeMap<String, DocValue>> for DocValue {
    fn from(m: BTreeMap<String, DocValue>) -> Self {
        DocValue::Object(m)
    }
}
