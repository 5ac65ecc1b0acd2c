//! Size limits for documents, attributes and sub-document requests
//!
//! | Limit | Value | Constant |
//! |-------|-------|----------|
//! | Max document body size | 20 MiB | [`MAX_DOCUMENT_SIZE`] |
//! | Max total xattr size | 1 MiB | [`MAX_XATTR_SIZE`] |
//! | Max path depth | 32 segments | [`MAX_PATH_DEPTH`] |
//! | Max path text | 1024 bytes | [`MAX_PATH_BYTES`] |
//! | Max value nesting | 32 levels | [`MAX_NESTING_DEPTH`] |
//! | Max specs per request | 16 | [`MAX_SPECS_PER_REQUEST`] |
//!
//! Sizes are measured on the compact JSON encoding.

use crate::value::DocValue;
use thiserror::Error;

/// Maximum document body size in bytes (20 MiB)
pub const MAX_DOCUMENT_SIZE: usize = 20 * 1024 * 1024;

/// Maximum combined size of all extended attributes of a document (1 MiB)
pub const MAX_XATTR_SIZE: usize = 1024 * 1024;

/// Maximum number of segments in a path
pub const MAX_PATH_DEPTH: usize = 32;

/// Maximum length of a path string in bytes
pub const MAX_PATH_BYTES: usize = 1024;

/// Maximum nesting depth of a value written through a path
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum number of operations in one lookup or mutate request
pub const MAX_SPECS_PER_REQUEST: usize = 16;

/// Error type for limit violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimitError {
    /// Document body exceeds maximum size
    #[error("document size {size} exceeds maximum of {max} bytes")]
    DocumentTooLarge {
        /// Actual size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Extended attributes exceed maximum combined size
    #[error("xattr size {size} exceeds maximum of {max} bytes")]
    XattrTooLarge {
        /// Actual size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Value nesting exceeds maximum depth
    #[error("nesting depth {depth} exceeds maximum of {max} levels")]
    NestingTooDeep {
        /// Actual depth
        depth: usize,
        /// Maximum allowed depth
        max: usize,
    },

    /// Path has too many segments
    #[error("path depth {depth} exceeds maximum of {max} segments")]
    PathTooDeep {
        /// Actual depth
        depth: usize,
        /// Maximum allowed depth
        max: usize,
    },

    /// Path string is too long
    #[error("path length {length} exceeds maximum of {max} bytes")]
    PathTooLong {
        /// Actual length
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Request carries too many specs
    #[error("request has {count} specs, maximum is {max}")]
    TooManySpecs {
        /// Number of specs supplied
        count: usize,
        /// Maximum allowed
        max: usize,
    },
}

/// Validate the number of specs in a single request
pub fn validate_spec_count(count: usize) -> Result<(), LimitError> {
    if count > MAX_SPECS_PER_REQUEST {
        return Err(LimitError::TooManySpecs {
            count,
            max: MAX_SPECS_PER_REQUEST,
        });
    }
    Ok(())
}

/// Validate a document body against size and nesting limits
pub fn validate_body(body: &DocValue) -> Result<(), LimitError> {
    let size = body.encoded_len();
    if size > MAX_DOCUMENT_SIZE {
        return Err(LimitError::DocumentTooLarge {
            size,
            max: MAX_DOCUMENT_SIZE,
        });
    }
    validate_depth(body)
}

/// Validate a value's nesting depth
pub fn validate_depth(value: &DocValue) -> Result<(), LimitError> {
    let depth = value.nesting_depth();
    if depth > MAX_NESTING_DEPTH {
        return Err(LimitError::NestingTooDeep {
            depth,
            max: MAX_NESTING_DEPTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_count_boundary() {
        assert!(validate_spec_count(MAX_SPECS_PER_REQUEST).is_ok());
        assert_eq!(
            validate_spec_count(MAX_SPECS_PER_REQUEST + 1),
            Err(LimitError::TooManySpecs { count: 17, max: 16 })
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut value = DocValue::Int(1);
        for _ in 0..MAX_NESTING_DEPTH {
            value = DocValue::Array(vec![value]);
        }
        assert!(validate_depth(&value).is_ok());

        let too_deep = DocValue::Array(vec![value]);
        assert!(matches!(
            validate_depth(&too_deep),
            Err(LimitError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_body_within_limits() {
        let body = DocValue::from(serde_json::json!({"name": "Hotel", "rooms": [1, 2, 3]}));
        assert!(validate_body(&body).is_ok());
    }
}
