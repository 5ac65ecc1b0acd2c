//! Store-computed virtual attributes
//!
//! The reserved `$document` attribute is never stored. Reads of
//! `$document` or `$document.<field>` are answered from the document's
//! store-owned state. Every attribute whose name starts with `$` is
//! read-only.

use crate::document::Document;
use crate::spec::MutationMacro;
use crate::value::DocValue;
use std::collections::BTreeMap;

/// Name of the reserved virtual attribute
pub const VIRTUAL_DOCUMENT: &str = "$document";

/// Fields of the `$document` virtual attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualAttr {
    /// CAS as a hex string
    Cas,
    /// Expiry in seconds since epoch, 0 when none
    Exptime,
    /// Body size in bytes
    ValueBytes,
    /// CRC32 of the body as a hex string
    ValueCrc32,
    /// Sequence number as a hex string
    Seqno,
    /// Last modification in seconds since epoch
    LastModified,
    /// Content flags (`json`, plus `xattr` when attributes are present)
    Datatype,
    /// Combined size of the stored attributes
    XattrBytes,
}

impl VirtualAttr {
    /// All fields, in the order they appear in the `$document` object
    pub const ALL: [VirtualAttr; 8] = [
        VirtualAttr::Cas,
        VirtualAttr::Exptime,
        VirtualAttr::ValueBytes,
        VirtualAttr::ValueCrc32,
        VirtualAttr::Seqno,
        VirtualAttr::LastModified,
        VirtualAttr::Datatype,
        VirtualAttr::XattrBytes,
    ];

    /// Field name under `$document`
    pub fn name(&self) -> &'static str {
        match self {
            VirtualAttr::Cas => "CAS",
            VirtualAttr::Exptime => "exptime",
            VirtualAttr::ValueBytes => "value_bytes",
            VirtualAttr::ValueCrc32 => "value_crc32",
            VirtualAttr::Seqno => "seqno",
            VirtualAttr::LastModified => "last_modified",
            VirtualAttr::Datatype => "datatype",
            VirtualAttr::XattrBytes => "xattr_bytes",
        }
    }

    /// Look up a field by name
    pub fn from_name(name: &str) -> Option<Self> {
        VirtualAttr::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Compute this field for a document
    pub fn compute(&self, doc: &Document) -> DocValue {
        match self {
            VirtualAttr::Cas => DocValue::String(doc.cas.to_hex()),
            VirtualAttr::Exptime => {
                DocValue::Int(doc.expiry.map(|t| t.as_secs() as i64).unwrap_or(0))
            }
            VirtualAttr::ValueBytes => DocValue::Int(doc.body_size() as i64),
            VirtualAttr::ValueCrc32 => DocValue::String(crc32_hex(body_crc32(&doc.body))),
            VirtualAttr::Seqno => DocValue::String(format!("0x{:016x}", doc.seqno)),
            VirtualAttr::LastModified => DocValue::Int(doc.last_modified.as_secs() as i64),
            VirtualAttr::Datatype => {
                let mut flags = vec![DocValue::from("json")];
                if !doc.xattrs.is_empty() {
                    flags.push(DocValue::from("xattr"));
                }
                DocValue::Array(flags)
            }
            VirtualAttr::XattrBytes => DocValue::Int(doc.xattr_size() as i64),
        }
    }
}

/// True for attribute names reserved to the store
pub fn is_reserved(name: &str) -> bool {
    name.starts_with('$')
}

/// The whole `$document` object for a document
pub fn document_object(doc: &Document) -> DocValue {
    let fields: BTreeMap<String, DocValue> = VirtualAttr::ALL
        .iter()
        .map(|f| (f.name().to_string(), f.compute(doc)))
        .collect();
    DocValue::Object(fields)
}

/// CRC32 of a body's compact JSON encoding
pub fn body_crc32(body: &DocValue) -> u32 {
    crc32fast::hash(body.to_json_string().as_bytes())
}

fn crc32_hex(crc: u32) -> String {
    format!("0x{:08x}", crc)
}

/// Expand a mutation macro against the committed document state
pub fn expand_macro(m: MutationMacro, doc: &Document) -> DocValue {
    match m {
        MutationMacro::Cas => VirtualAttr::Cas.compute(doc),
        MutationMacro::SeqNo => VirtualAttr::Seqno.compute(doc),
        MutationMacro::ValueCrc32 => VirtualAttr::ValueCrc32.compute(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Cas, Timestamp};

    fn sample() -> Document {
        let mut doc = Document::new(
            "hotel_10138",
            DocValue::from(serde_json::json!({"name": "Medway"})),
        );
        doc.cas = Cas::from_raw(0xabc);
        doc.seqno = 7;
        doc.last_modified = Timestamp::from_secs(1_700_000_000);
        doc
    }

    #[test]
    fn test_names_round_trip() {
        for f in VirtualAttr::ALL {
            assert_eq!(VirtualAttr::from_name(f.name()), Some(f));
        }
        assert_eq!(VirtualAttr::from_name("nope"), None);
    }

    #[test]
    fn test_exptime_zero_without_expiry() {
        let mut doc = sample();
        assert_eq!(VirtualAttr::Exptime.compute(&doc), DocValue::Int(0));
        doc.expiry = Some(Timestamp::from_secs(1_700_000_600));
        assert_eq!(VirtualAttr::Exptime.compute(&doc), DocValue::Int(1_700_000_600));
    }

    #[test]
    fn test_cas_and_seqno_are_hex() {
        let doc = sample();
        assert_eq!(
            VirtualAttr::Cas.compute(&doc),
            DocValue::from("0x0000000000000abc")
        );
        assert_eq!(
            VirtualAttr::Seqno.compute(&doc),
            DocValue::from("0x0000000000000007")
        );
    }

    #[test]
    fn test_value_bytes_and_crc() {
        let doc = sample();
        let encoded = r#"{"name":"Medway"}"#;
        assert_eq!(
            VirtualAttr::ValueBytes.compute(&doc),
            DocValue::Int(encoded.len() as i64)
        );
        assert_eq!(
            VirtualAttr::ValueCrc32.compute(&doc),
            DocValue::String(format!("0x{:08x}", crc32fast::hash(encoded.as_bytes())))
        );
    }

    #[test]
    fn test_datatype_reports_xattrs() {
        let mut doc = sample();
        assert_eq!(VirtualAttr::Datatype.compute(&doc).as_array().map(|a| a.len()), Some(1));
        doc.xattrs.insert("discounts".into(), DocValue::object());
        assert_eq!(VirtualAttr::Datatype.compute(&doc).as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_document_object_has_every_field() {
        let obj = document_object(&sample());
        for f in VirtualAttr::ALL {
            assert!(obj.get(f.name()).is_some(), "missing {}", f.name());
        }
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved(VIRTUAL_DOCUMENT));
        assert!(is_reserved("$vbucket"));
        assert!(!is_reserved("discounts"));
        assert!(!is_reserved("_sync"));
    }

    #[test]
    fn test_expand_macro_matches_virtual_fields() {
        let doc = sample();
        assert_eq!(expand_macro(MutationMacro::Cas, &doc), VirtualAttr::Cas.compute(&doc));
        assert_eq!(
            expand_macro(MutationMacro::ValueCrc32, &doc),
            VirtualAttr::ValueCrc32.compute(&doc)
        );
    }
}
