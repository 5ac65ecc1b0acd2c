//! Sub-document accessor behavior through a connected collection

mod common;

use common::*;
use docmeta_core::{
    DocValue, Error, LookupSpec, MutateInOptions, MutateSpec, MutationMacro, PathNamespace,
    WriteMode,
};
use docmeta_engine::WriteOptions;
use proptest::prelude::*;

const XATTR: PathNamespace = PathNamespace::Metadata;

// ============================================================================
// Single-path accessors
// ============================================================================

#[test]
fn upsert_then_read_returns_value() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();

    coll.write("hotel_1", DISCOUNT_PATH, 20, &WriteOptions::xattr())
        .unwrap();
    assert_eq!(
        coll.read("hotel_1", DISCOUNT_PATH, XATTR).unwrap(),
        DocValue::Int(20)
    );
    assert!(coll.exists("hotel_1", DISCOUNT_PATH, XATTR).unwrap());
    assert!(!coll.exists("hotel_1", DISCOUNT_PATH, PathNamespace::Body).unwrap());
}

#[test]
fn insert_only_after_write_fails_with_path_exists() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();
    let insert = WriteOptions::xattr().insert_only();

    coll.write("hotel_1", DISCOUNT_PATH, 20, &insert).unwrap();
    let err = coll.write("hotel_1", DISCOUNT_PATH, 25, &insert).unwrap_err();
    assert!(matches!(err, Error::PathExists { .. }));
    assert_eq!(
        coll.read("hotel_1", DISCOUNT_PATH, XATTR).unwrap(),
        DocValue::Int(20)
    );
}

#[test]
fn replace_requires_existing_value() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();
    let replace = WriteOptions::xattr().with_mode(WriteMode::Replace);

    let err = coll.write("hotel_1", DISCOUNT_PATH, 1, &replace).unwrap_err();
    assert!(matches!(err, Error::PathNotFound { .. }));

    coll.write("hotel_1", DISCOUNT_PATH, 1, &WriteOptions::xattr())
        .unwrap();
    coll.write("hotel_1", DISCOUNT_PATH, 2, &replace).unwrap();
    assert_eq!(
        coll.read("hotel_1", DISCOUNT_PATH, XATTR).unwrap(),
        DocValue::Int(2)
    );
}

#[test]
fn remove_then_exists_is_false() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    seed_hotel(&coll, "hotel_1", 20);

    coll.remove("hotel_1", DISCOUNT_PATH, XATTR).unwrap();
    assert!(!coll.exists("hotel_1", DISCOUNT_PATH, XATTR).unwrap());
    assert!(coll.exists("hotel_1", "discounts", XATTR).unwrap());

    let err = coll.remove("hotel_1", DISCOUNT_PATH, XATTR).unwrap_err();
    assert!(matches!(err, Error::PathNotFound { .. }));
}

#[test]
fn create_missing_parents_controls_intermediates() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();

    let strict = WriteOptions::xattr().create_missing_parents(false);
    let err = coll
        .write("hotel_1", "audit.created.by", "jsmith123", &strict)
        .unwrap_err();
    assert!(matches!(err, Error::PathNotFound { .. }));
    assert!(!coll.exists("hotel_1", "audit", XATTR).unwrap());

    coll.write("hotel_1", "audit.created.by", "jsmith123", &WriteOptions::xattr())
        .unwrap();
    assert_eq!(
        coll.read("hotel_1", "audit.created.by", XATTR).unwrap(),
        DocValue::from("jsmith123")
    );
}

#[test]
fn missing_document_and_missing_path() {
    let tc = TestCluster::new();
    let coll = tc.collection();

    assert!(matches!(
        coll.exists("ghost", DISCOUNT_PATH, XATTR),
        Err(Error::DocumentNotFound { .. })
    ));
    assert!(matches!(
        coll.read("ghost", DISCOUNT_PATH, XATTR),
        Err(Error::DocumentNotFound { .. })
    ));

    coll.upsert("hotel_1", DocValue::object()).unwrap();
    assert!(matches!(
        coll.read("hotel_1", DISCOUNT_PATH, XATTR),
        Err(Error::PathNotFound { .. })
    ));
}

// ============================================================================
// Virtual attributes
// ============================================================================

#[test]
fn virtual_attributes_readable_without_write() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    let cas = coll.upsert("hotel_1", DocValue::object()).unwrap();

    assert_eq!(
        coll.read("hotel_1", "$document.CAS", XATTR).unwrap(),
        DocValue::from(cas.to_hex())
    );
    assert!(coll.exists("hotel_1", "$document.value_crc32", XATTR).unwrap());
    assert!(coll.read("hotel_1", "$document", XATTR).unwrap().is_object());
}

#[test]
fn virtual_attributes_are_read_only() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();

    let err = coll
        .write("hotel_1", "$document.CAS", "0x0", &WriteOptions::xattr())
        .unwrap_err();
    assert!(matches!(err, Error::ReadOnlyField { .. }));

    let err = coll.remove("hotel_1", "$document.exptime", XATTR).unwrap_err();
    assert!(matches!(err, Error::ReadOnlyField { .. }));
}

// ============================================================================
// Batches and CAS
// ============================================================================

#[test]
fn stale_cas_is_rejected() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    let first = coll.upsert("hotel_1", DocValue::object()).unwrap();
    coll.write("hotel_1", DISCOUNT_PATH, 20, &WriteOptions::xattr())
        .unwrap();

    let err = coll
        .write(
            "hotel_1",
            DISCOUNT_PATH,
            30,
            &WriteOptions::xattr().with_cas(first),
        )
        .unwrap_err();
    assert!(matches!(err, Error::CasMismatch { .. }));

    let current = coll.get("hotel_1").unwrap().cas;
    let result = coll
        .write(
            "hotel_1",
            DISCOUNT_PATH,
            30,
            &WriteOptions::xattr().with_cas(current),
        )
        .unwrap();
    assert_ne!(result.cas, current);
}

#[test]
fn failed_batch_leaves_document_unchanged() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    seed_hotel(&coll, "hotel_1", 20);
    let before = coll.get("hotel_1").unwrap();

    let specs = vec![
        MutateSpec::upsert(DISCOUNT_PATH, DocValue::Int(99)).unwrap().xattr(),
        MutateSpec::upsert("name", DocValue::from("changed")).unwrap(),
        MutateSpec::insert("discounts", DocValue::object()).unwrap().xattr(),
    ];
    let err = coll
        .mutate_in("hotel_1", &specs, &MutateInOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::PathExists { .. }));

    let after = coll.get("hotel_1").unwrap();
    assert_eq!(after, before);
    assert_eq!(
        coll.read("hotel_1", DISCOUNT_PATH, XATTR).unwrap(),
        DocValue::Int(20)
    );
}

#[test]
fn batch_is_last_write_wins_and_expands_macros() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();

    let specs = vec![
        MutateSpec::upsert(DISCOUNT_PATH, DocValue::Int(1)).unwrap().xattr().create_parents(),
        MutateSpec::upsert(DISCOUNT_PATH, DocValue::Int(2)).unwrap().xattr(),
        MutateSpec::upsert("audit.cas", MutationMacro::Cas).unwrap().xattr().create_parents(),
    ];
    let result = coll
        .mutate_in("hotel_1", &specs, &MutateInOptions::new())
        .unwrap();

    let lookup = coll
        .lookup_in(
            "hotel_1",
            &[
                LookupSpec::get(DISCOUNT_PATH).unwrap().xattr(),
                LookupSpec::get("audit.cas").unwrap().xattr(),
                LookupSpec::exists("missing").unwrap().xattr(),
            ],
        )
        .unwrap();
    assert_eq!(lookup.content(0).unwrap(), &DocValue::Int(2));
    assert_eq!(lookup.content(1).unwrap(), &DocValue::from(result.cas.to_hex()));
    assert!(!lookup.exists(2));
    assert_eq!(lookup.cas, result.cas);
}

#[test]
fn oversized_batch_is_rejected_with_limit() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert("hotel_1", DocValue::object()).unwrap();
    let before = coll.get("hotel_1").unwrap();

    let specs: Vec<MutateSpec> = (0..=docmeta_core::MAX_SPECS_PER_REQUEST)
        .map(|i| {
            MutateSpec::upsert(&format!("tag{}", i), DocValue::Int(i as i64))
                .unwrap()
                .xattr()
        })
        .collect();
    assert_eq!(specs.len(), 17);

    let err = coll
        .mutate_in("hotel_1", &specs, &MutateInOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::Limit(_)));
    assert_eq!(coll.get("hotel_1").unwrap(), before);
    assert!(!coll.exists("hotel_1", "tag0", XATTR).unwrap());

    coll.mutate_in("hotel_1", &specs[..16], &MutateInOptions::new())
        .unwrap();
    assert!(coll.exists("hotel_1", "tag15", XATTR).unwrap());
}

#[test]
fn remove_document_drops_body_and_attributes() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    seed_hotel(&coll, "hotel_1", 20);
    let cas = coll.get("hotel_1").unwrap().cas;

    coll.write("hotel_1", DISCOUNT_PATH, 25, &WriteOptions::xattr())
        .unwrap();
    let err = coll.remove_document("hotel_1", Some(cas)).unwrap_err();
    assert!(matches!(err, Error::CasMismatch { .. }));

    coll.remove_document("hotel_1", None).unwrap();
    assert!(matches!(
        coll.exists("hotel_1", DISCOUNT_PATH, XATTR),
        Err(Error::DocumentNotFound { .. })
    ));
    assert!(matches!(
        coll.remove_document("hotel_1", None),
        Err(Error::DocumentNotFound { .. })
    ));

    coll.insert("hotel_1", DocValue::object()).unwrap();
    assert!(!coll.exists("hotel_1", "discounts", XATTR).unwrap());
}

#[test]
fn single_path_write_keeps_expiry() {
    let tc = TestCluster::new();
    let coll = tc.collection();
    coll.upsert_with_expiry("hotel_1", DocValue::object(), std::time::Duration::from_secs(3600))
        .unwrap();
    let before = coll.get("hotel_1").unwrap().expiry;
    assert!(before.is_some());

    coll.write("hotel_1", DISCOUNT_PATH, 20, &WriteOptions::xattr())
        .unwrap();
    assert_eq!(coll.get("hotel_1").unwrap().expiry, before);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn write_then_read_round_trips(
        user in "[a-z]{1,8}[0-9]{0,3}",
        amount in -1000i64..1000,
    ) {
        let tc = TestCluster::new();
        let coll = tc.collection();
        coll.upsert("hotel_1", DocValue::object()).unwrap();
        let path = format!("discounts.{}", user);

        coll.write("hotel_1", &path, amount, &WriteOptions::xattr()).unwrap();
        prop_assert_eq!(coll.read("hotel_1", &path, XATTR).unwrap(), DocValue::Int(amount));

        let err = coll
            .write("hotel_1", &path, amount, &WriteOptions::xattr().insert_only())
            .unwrap_err();
        let is_path_exists = matches!(err, Error::PathExists { .. });
        prop_assert!(is_path_exists);

        coll.remove("hotel_1", &path, XATTR).unwrap();
        prop_assert!(!coll.exists("hotel_1", &path, XATTR).unwrap());
    }
}
