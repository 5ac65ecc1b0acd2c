//! Expiry index for efficient purging of expired documents
//!
//! Maps expiry timestamp → set of document keys using a BTreeMap, so
//! finding everything expired at `now` is O(expired count) instead of a scan
//! of the whole store.

use docmeta_core::Timestamp;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// Expiry index: expiry timestamp → document keys
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    index: BTreeMap<Timestamp, FxHashSet<String>>,
}

impl ExpiryIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            index: BTreeMap::new(),
        }
    }

    /// Register `key` as expiring at `expiry`
    pub fn insert(&mut self, expiry: Timestamp, key: String) {
        self.index.entry(expiry).or_default().insert(key);
    }

    /// Unregister `key` from `expiry`
    ///
    /// Drops the timestamp entry once its set is empty.
    pub fn remove(&mut self, expiry: Timestamp, key: &str) {
        if let Some(keys) = self.index.get_mut(&expiry) {
            keys.remove(key);
            if keys.is_empty() {
                self.index.remove(&expiry);
            }
        }
    }

    /// Move `key` from one expiry to another
    pub fn update(&mut self, old: Option<Timestamp>, new: Option<Timestamp>, key: &str) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            self.remove(old, key);
        }
        if let Some(new) = new {
            self.insert(new, key.to_string());
        }
    }

    /// Keys whose expiry is at or before `now`
    pub fn find_expired(&self, now: Timestamp) -> Vec<String> {
        self.index
            .range(..=now)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    /// Drop all entries at or before `now`, returning how many keys were dropped
    pub fn remove_expired(&mut self, now: Timestamp) -> usize {
        let expired: Vec<Timestamp> = self.index.range(..=now).map(|(ts, _)| *ts).collect();

        let mut count = 0;
        for ts in expired {
            if let Some(keys) = self.index.remove(&ts) {
                count += keys.len();
            }
        }
        count
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total number of keys in the index
    pub fn len(&self) -> usize {
        self.index.values().map(|keys| keys.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_expired_is_inclusive() {
        let mut index = ExpiryIndex::new();
        index.insert(Timestamp::from_secs(10), "a".into());
        index.insert(Timestamp::from_secs(20), "b".into());

        assert!(index.find_expired(Timestamp::from_secs(9)).is_empty());
        assert_eq!(index.find_expired(Timestamp::from_secs(10)), vec!["a".to_string()]);

        let mut both = index.find_expired(Timestamp::from_secs(25));
        both.sort();
        assert_eq!(both, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_remove_drops_empty_timestamps() {
        let mut index = ExpiryIndex::new();
        index.insert(Timestamp::from_secs(10), "a".into());
        index.remove(Timestamp::from_secs(10), "a");
        assert!(index.is_empty());
    }

    #[test]
    fn test_update_moves_key() {
        let mut index = ExpiryIndex::new();
        index.update(None, Some(Timestamp::from_secs(10)), "a");
        index.update(Some(Timestamp::from_secs(10)), Some(Timestamp::from_secs(30)), "a");
        assert!(index.find_expired(Timestamp::from_secs(20)).is_empty());
        assert_eq!(index.len(), 1);

        index.update(Some(Timestamp::from_secs(30)), None, "a");
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_expired_counts_keys() {
        let mut index = ExpiryIndex::new();
        index.insert(Timestamp::from_secs(1), "a".into());
        index.insert(Timestamp::from_secs(1), "b".into());
        index.insert(Timestamp::from_secs(5), "c".into());
        assert_eq!(index.remove_expired(Timestamp::from_secs(2)), 2);
        assert_eq!(index.len(), 1);
    }
}
