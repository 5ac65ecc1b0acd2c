//! Compare-and-swap token
//!
//! Every successful mutation of a document assigns it a new CAS value.
//! Callers may pass the CAS they last observed to a mutation; the store
//! rejects the mutation if the document has changed since.
//!
//! CAS values are opaque to callers. They are allocated from a single
//! monotonic counter per store, so they are unique within a store and
//! never zero for a stored document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque compare-and-swap token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cas(u64);

impl Cas {
    /// The "no CAS" value; never assigned to a stored document
    pub const ZERO: Cas = Cas(0);

    /// Wrap a raw CAS value
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Cas(raw)
    }

    /// Raw CAS value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// True for [`Cas::ZERO`]
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Hex form used by the `$document.CAS` virtual attribute
    pub fn to_hex(&self) -> String {
        format!("0x{:016x}", self.0)
    }
}

impl fmt::Display for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<u64> for Cas {
    fn from(raw: u64) -> Self {
        Cas(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cas_hex_is_fixed_width() {
        assert_eq!(Cas::from_raw(0x1f).to_hex(), "0x000000000000001f");
        assert_eq!(Cas::from_raw(1).to_string(), "0x0000000000000001");
    }

    #[test]
    fn test_cas_ordering() {
        assert!(Cas::from_raw(1) < Cas::from_raw(2));
        assert!(Cas::ZERO.is_zero());
        assert!(!Cas::from_raw(7).is_zero());
    }

    #[test]
    fn test_cas_serializes_as_number() {
        let json = serde_json::to_string(&Cas::from_raw(42)).unwrap();
        assert_eq!(json, "42");
    }
}
