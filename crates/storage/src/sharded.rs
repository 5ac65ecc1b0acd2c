//! Sharded in-memory document store
//!
//! DashMap keyed by document id, hashed with FxHash. Each document lives in
//! exactly one DashMap shard, and every mutation holds that shard's write
//! guard for the whole read-modify-write, so mutations of one document are
//! serialized while other documents proceed in parallel.
//!
//! # CAS and sequence numbers
//!
//! Both come from store-wide atomic counters starting at 1, so a stored
//! document never has a zero CAS and every commit gets a fresh one. They are
//! drawn while the entry guard is held, so successive commits to one
//! document see increasing CAS, seqno and modification time.
//!
//! Lock order is shard, then expiry index.
//!
//! # Expiry
//!
//! Expired documents are invisible to every read and write (lazy expiry).
//! [`MemoryStore::purge_expired`] physically drops them using the
//! [`ExpiryIndex`].

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docmeta_core::{
    Cas, DocValue, Document, DocumentStore, Error, GetResult, LookupInResult, LookupSpec,
    MutateInOptions, MutateSpec, MutationResult, Result, Timestamp,
};
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::subdoc::{apply_mutations, execute_lookups, CommitStamp};
use crate::ttl::ExpiryIndex;

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// In-memory document store
///
/// # Example
///
/// ```
/// use docmeta_core::{DocValue, DocumentStore, MutateInOptions, MutateSpec};
/// use docmeta_storage::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.insert("hotel_10138", DocValue::object(), None).unwrap();
///
/// let specs = [MutateSpec::upsert("discounts.jsmith123", DocValue::Int(20))
///     .unwrap()
///     .xattr()
///     .create_parents()];
/// store.mutate_in("hotel_10138", &specs, &MutateInOptions::new()).unwrap();
///
/// // Extended attributes never show up in the body
/// assert_eq!(store.get("hotel_10138").unwrap().body, DocValue::object());
/// ```
pub struct MemoryStore {
    docs: DashMap<String, Document, FxBuildHasher>,
    cas: AtomicU64,
    seqno: AtomicU64,
    expiry: Mutex<ExpiryIndex>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            docs: DashMap::with_hasher(FxBuildHasher::default()),
            cas: AtomicU64::new(0),
            seqno: AtomicU64::new(0),
            expiry: Mutex::new(ExpiryIndex::new()),
        }
    }

    #[inline]
    fn next_stamp(&self) -> CommitStamp {
        CommitStamp {
            cas: Cas::from_raw(self.cas.fetch_add(1, Ordering::AcqRel) + 1),
            seqno: self.seqno.fetch_add(1, Ordering::AcqRel) + 1,
            now: Timestamp::now(),
        }
    }

    fn stamp(doc: &mut Document, stamp: CommitStamp) {
        doc.cas = stamp.cas;
        doc.seqno = stamp.seqno;
        doc.last_modified = stamp.now;
    }

    fn fresh_document(
        id: &str,
        body: DocValue,
        expiry: Option<Duration>,
        stamp: CommitStamp,
    ) -> Document {
        let mut doc = Document::new(id, body);
        Self::stamp(&mut doc, stamp);
        doc.expiry = expiry.map(|ttl| stamp.now.saturating_add(ttl));
        doc
    }

    /// Snapshot of a live document, attributes included
    pub fn document(&self, id: &str) -> Option<Document> {
        let now = Timestamp::now();
        self.docs
            .get(id)
            .filter(|doc| !doc.is_expired(now))
            .map(|doc| doc.clone())
    }

    /// Drop every document expired at `now`; returns how many were dropped
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let candidates = self.expiry.lock().find_expired(now);
        let purged = candidates
            .iter()
            .filter(|key| {
                self.docs
                    .remove_if(key.as_str(), |_, doc| doc.is_expired(now))
                    .is_some()
            })
            .count();
        self.expiry.lock().remove_expired(now);

        if purged > 0 {
            tracing::debug!(target: "docmeta::store", purged, "purged expired documents");
        }
        purged
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: &str) -> Result<GetResult> {
        let now = Timestamp::now();
        self.docs
            .get(id)
            .filter(|doc| !doc.is_expired(now))
            .map(|doc| GetResult {
                id: doc.id.clone(),
                body: doc.body.clone(),
                cas: doc.cas,
                expiry: doc.expiry,
            })
            .ok_or_else(|| Error::document_not_found(id))
    }

    fn insert(&self, id: &str, body: DocValue, expiry: Option<Duration>) -> Result<Cas> {
        docmeta_core::limits::validate_body(&body)?;

        match self.docs.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_expired(Timestamp::now()) {
                    return Err(Error::DocumentExists { id: id.to_string() });
                }
                let stamp = self.next_stamp();
                let doc = Self::fresh_document(id, body, expiry, stamp);
                let new_expiry = doc.expiry;
                let old = entry.insert(doc);
                self.expiry.lock().update(old.expiry, new_expiry, id);
                Ok(stamp.cas)
            }
            Entry::Vacant(entry) => {
                let stamp = self.next_stamp();
                let doc = Self::fresh_document(id, body, expiry, stamp);
                let new_expiry = doc.expiry;
                let _guard = entry.insert(doc);
                self.expiry.lock().update(None, new_expiry, id);
                Ok(stamp.cas)
            }
        }
    }

    fn upsert(&self, id: &str, body: DocValue, expiry: Option<Duration>) -> Result<Cas> {
        docmeta_core::limits::validate_body(&body)?;

        match self.docs.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                let stamp = self.next_stamp();
                let new_expiry = expiry.map(|ttl| stamp.now.saturating_add(ttl));
                let doc = entry.get_mut();
                let old = doc.expiry;
                if doc.is_expired(stamp.now) {
                    doc.xattrs.clear();
                }
                doc.body = body;
                doc.expiry = new_expiry;
                Self::stamp(doc, stamp);
                self.expiry.lock().update(old, new_expiry, id);
                Ok(stamp.cas)
            }
            Entry::Vacant(entry) => {
                let stamp = self.next_stamp();
                let doc = Self::fresh_document(id, body, expiry, stamp);
                let new_expiry = doc.expiry;
                let _guard = entry.insert(doc);
                self.expiry.lock().update(None, new_expiry, id);
                Ok(stamp.cas)
            }
        }
    }

    fn remove(&self, id: &str, cas: Option<Cas>) -> Result<()> {
        let now = Timestamp::now();
        match self.docs.entry(id.to_string()) {
            Entry::Occupied(entry) => {
                let doc = entry.get();
                if doc.is_expired(now) {
                    self.expiry.lock().update(doc.expiry, None, id);
                    entry.remove();
                    return Err(Error::document_not_found(id));
                }
                if let Some(expected) = cas {
                    if expected != doc.cas {
                        return Err(Error::CasMismatch {
                            id: id.to_string(),
                            expected,
                            actual: doc.cas,
                        });
                    }
                }
                // Index first; removing the entry releases the shard lock
                self.expiry.lock().update(doc.expiry, None, id);
                entry.remove();
                Ok(())
            }
            Entry::Vacant(_) => Err(Error::document_not_found(id)),
        }
    }

    fn touch(&self, id: &str, expiry: Option<Duration>) -> Result<Cas> {
        let mut doc = self
            .docs
            .get_mut(id)
            .filter(|doc| !doc.is_expired(Timestamp::now()))
            .ok_or_else(|| Error::document_not_found(id))?;

        let stamp = self.next_stamp();
        let new_expiry = expiry.map(|ttl| stamp.now.saturating_add(ttl));
        let old = doc.expiry;
        doc.expiry = new_expiry;
        Self::stamp(&mut doc, stamp);
        self.expiry.lock().update(old, new_expiry, id);
        Ok(stamp.cas)
    }

    fn lookup_in(&self, id: &str, specs: &[LookupSpec]) -> Result<LookupInResult> {
        let now = Timestamp::now();
        let doc = self
            .docs
            .get(id)
            .filter(|doc| !doc.is_expired(now))
            .ok_or_else(|| Error::document_not_found(id))?;
        execute_lookups(&doc, specs)
    }

    fn mutate_in(
        &self,
        id: &str,
        specs: &[MutateSpec],
        options: &MutateInOptions,
    ) -> Result<MutationResult> {
        options.validate()?;

        let mut guard = self
            .docs
            .get_mut(id)
            .filter(|doc| !doc.is_expired(Timestamp::now()))
            .ok_or_else(|| Error::document_not_found(id))?;

        if let Some(expected) = options.cas {
            if expected != guard.cas {
                return Err(Error::CasMismatch {
                    id: id.to_string(),
                    expected,
                    actual: guard.cas,
                });
            }
        }

        // Stamped under the shard guard so commits of one document take
        // strictly increasing CAS, seqno and last_modified values
        let stamp = self.next_stamp();
        let mut working = guard.clone();
        let values = apply_mutations(&mut working, specs, stamp).map_err(|e| {
            tracing::debug!(target: "docmeta::store", id, error = %e, "mutation rejected");
            e
        })?;
        working.expiry = options.resolve_expiry(guard.expiry, stamp.now);

        let old_expiry = guard.expiry;
        let new_expiry = working.expiry;
        *guard = working;
        self.expiry.lock().update(old_expiry, new_expiry, id);
        drop(guard);

        Ok(MutationResult {
            cas: stamp.cas,
            seqno: stamp.seqno,
            values,
        })
    }

    fn scan_ids(&self, prefix: &str) -> Vec<String> {
        let now = Timestamp::now();
        let mut ids: Vec<String> = self
            .docs
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    fn len(&self) -> usize {
        let now = Timestamp::now();
        self.docs
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmeta_core::{LimitError, MutationMacro};
    use serde_json::json;

    fn store_with_hotel() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(
                "hotel_10138",
                DocValue::from(json!({"name": "Medway Youth Hostel", "city": "Medway"})),
                None,
            )
            .unwrap();
        store
    }

    fn xattr_upsert(path: &str, value: DocValue) -> MutateSpec {
        MutateSpec::upsert(path, value).unwrap().xattr().create_parents()
    }

    #[test]
    fn test_insert_then_get() {
        let store = store_with_hotel();
        let got = store.get("hotel_10138").unwrap();
        assert_eq!(got.body.get("city"), Some(&DocValue::from("Medway")));
        assert!(!got.cas.is_zero());
    }

    #[test]
    fn test_insert_existing_fails() {
        let store = store_with_hotel();
        assert!(matches!(
            store.insert("hotel_10138", DocValue::object(), None),
            Err(Error::DocumentExists { .. })
        ));
    }

    #[test]
    fn test_cas_changes_on_every_mutation() {
        let store = store_with_hotel();
        let before = store.get("hotel_10138").unwrap().cas;
        let result = store
            .mutate_in(
                "hotel_10138",
                &[xattr_upsert("a", DocValue::Int(1))],
                &MutateInOptions::new(),
            )
            .unwrap();
        assert!(result.cas > before);
        assert_eq!(store.get("hotel_10138").unwrap().cas, result.cas);
    }

    #[test]
    fn test_cas_mismatch_rejected() {
        let store = store_with_hotel();
        let err = store
            .mutate_in(
                "hotel_10138",
                &[xattr_upsert("a", DocValue::Int(1))],
                &MutateInOptions::new().with_cas(Cas::from_raw(12345)),
            )
            .unwrap_err();
        assert!(matches!(err, Error::CasMismatch { .. }));
        assert!(store.document("hotel_10138").unwrap().xattrs.is_empty());
    }

    #[test]
    fn test_failed_batch_leaves_document_unchanged() {
        let store = store_with_hotel();
        store
            .mutate_in(
                "hotel_10138",
                &[xattr_upsert("discounts.jsmith123", DocValue::Int(20))],
                &MutateInOptions::new(),
            )
            .unwrap();
        let before = store.document("hotel_10138").unwrap();

        let specs = [
            xattr_upsert("discounts.jsmith123", DocValue::Int(99)),
            MutateSpec::upsert("name", DocValue::from("changed")).unwrap(),
            MutateSpec::insert("discounts.jsmith123", DocValue::Int(1))
                .unwrap()
                .xattr(),
        ];
        let err = store
            .mutate_in("hotel_10138", &specs, &MutateInOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::PathExists { .. }));
        assert_eq!(store.document("hotel_10138").unwrap(), before);
    }

    #[test]
    fn test_upsert_keeps_xattrs() {
        let store = store_with_hotel();
        store
            .mutate_in(
                "hotel_10138",
                &[xattr_upsert("tag", DocValue::from("x"))],
                &MutateInOptions::new(),
            )
            .unwrap();
        store
            .upsert("hotel_10138", DocValue::from(json!({"name": "new"})), None)
            .unwrap();
        assert_eq!(
            store.document("hotel_10138").unwrap().xattr("tag"),
            Some(&DocValue::from("x"))
        );
    }

    #[test]
    fn test_remove_with_cas() {
        let store = store_with_hotel();
        let cas = store.get("hotel_10138").unwrap().cas;
        assert!(matches!(
            store.remove("hotel_10138", Some(Cas::from_raw(cas.as_u64() + 100))),
            Err(Error::CasMismatch { .. })
        ));
        store.remove("hotel_10138", Some(cas)).unwrap();
        assert!(matches!(
            store.get("hotel_10138"),
            Err(Error::DocumentNotFound { .. })
        ));
        assert!(matches!(
            store.remove("hotel_10138", None),
            Err(Error::DocumentNotFound { .. })
        ));
    }

    #[test]
    fn test_expired_documents_are_invisible_and_purged() {
        let store = MemoryStore::new();
        store
            .insert("ephemeral", DocValue::object(), Some(Duration::ZERO))
            .unwrap();
        store.insert("durable", DocValue::object(), None).unwrap();

        assert!(store.get("ephemeral").is_err());
        assert_eq!(store.scan_ids(""), vec!["durable".to_string()]);
        assert_eq!(store.len(), 1);

        assert_eq!(store.purge_expired(Timestamp::now()), 1);
        assert!(store.insert("ephemeral", DocValue::object(), None).is_ok());
    }

    #[test]
    fn test_insert_over_expired_document() {
        let store = MemoryStore::new();
        store
            .insert("d", DocValue::Int(1), Some(Duration::ZERO))
            .unwrap();
        store.insert("d", DocValue::Int(2), None).unwrap();
        assert_eq!(store.get("d").unwrap().body, DocValue::Int(2));
    }

    #[test]
    fn test_mutate_expiry_options() {
        let store = store_with_hotel();
        let specs = [xattr_upsert("a", DocValue::Int(1))];
        store
            .mutate_in(
                "hotel_10138",
                &specs,
                &MutateInOptions::new().with_expiry(Duration::from_secs(3600)),
            )
            .unwrap();
        let exp = store.get("hotel_10138").unwrap().expiry;
        assert!(exp.is_some());

        store
            .mutate_in("hotel_10138", &specs, &MutateInOptions::new().preserve_expiry())
            .unwrap();
        assert_eq!(store.get("hotel_10138").unwrap().expiry, exp);

        store
            .mutate_in("hotel_10138", &specs, &MutateInOptions::new())
            .unwrap();
        assert_eq!(store.get("hotel_10138").unwrap().expiry, None);
    }

    #[test]
    fn test_touch_sets_exptime() {
        let store = store_with_hotel();
        store
            .touch("hotel_10138", Some(Duration::from_secs(600)))
            .unwrap();
        let lookup = store
            .lookup_in(
                "hotel_10138",
                &[LookupSpec::get("$document.exptime").unwrap().xattr()],
            )
            .unwrap();
        assert!(lookup.content(0).unwrap().as_i64().unwrap() > 0);
    }

    #[test]
    fn test_macro_cas_equals_result_cas() {
        let store = store_with_hotel();
        let spec = MutateSpec::upsert("_sync.cas", MutationMacro::Cas)
            .unwrap()
            .xattr()
            .create_parents();
        let result = store
            .mutate_in("hotel_10138", &[spec], &MutateInOptions::new())
            .unwrap();
        let doc = store.document("hotel_10138").unwrap();
        assert_eq!(
            doc.xattr("_sync").and_then(|s| s.get("cas")),
            Some(&DocValue::String(result.cas.to_hex()))
        );
    }

    #[test]
    fn test_oversized_body_rejected() {
        let store = MemoryStore::new();
        let body = DocValue::String("x".repeat(docmeta_core::MAX_DOCUMENT_SIZE));
        assert!(matches!(
            store.insert("big", body, None),
            Err(Error::Limit(LimitError::DocumentTooLarge { .. }))
        ));
    }

    #[test]
    fn test_expiry_index_tracks_final_expiry_under_contention() {
        let store = std::sync::Arc::new(store_with_hotel());
        let handles: Vec<_> = (0..6)
            .map(|t| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..300u64 {
                        let ttl = match (t + i) % 3 {
                            0 => None,
                            n => Some(Duration::from_secs(3600 * n)),
                        };
                        if t % 2 == 0 {
                            store.upsert("hotel_10138", DocValue::object(), ttl).unwrap();
                        } else {
                            store.touch("hotel_10138", ttl).unwrap();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let doc = store.document("hotel_10138").unwrap();
        let index = store.expiry.lock();
        match doc.expiry {
            Some(at) => {
                assert_eq!(index.len(), 1);
                assert_eq!(index.find_expired(at), vec!["hotel_10138".to_string()]);
            }
            None => assert!(index.is_empty()),
        }
    }

    #[test]
    fn test_scan_ids_sorted_by_prefix() {
        let store = MemoryStore::new();
        for id in ["hotel_2", "airline_1", "hotel_1"] {
            store.insert(id, DocValue::object(), None).unwrap();
        }
        assert_eq!(
            store.scan_ids("hotel_"),
            vec!["hotel_1".to_string(), "hotel_2".to_string()]
        );
    }
}
