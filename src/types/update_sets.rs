//! Types that store pending updates to the app state.

use std::{
    collections::{hash_map, hash_set, HashMap, HashSet},
    hash::Hash,
};

use borsh::{BorshDeserialize, BorshSerialize};

/// Generic set of key-value updates that are applied together when a snapshot is committed.
///
/// # Uniqueness of Key between `inserts` and `deletes`
///
/// A key is in at most one of `inserts` and `deletes`: [`insert`](Self::insert) cancels a prior delete
/// and [`delete`](Self::delete) cancels a prior insert, so the last write to a key always wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UpdateSet<K: Eq + Hash, V: Eq + Hash> {
    /// Insertion updates.
    inserts: HashMap<K, V>,

    /// Deletion updates.
    deletes: HashSet<K>,
}

impl<K: Eq + Hash + Clone, V: Eq + Hash + Clone> UpdateSet<K, V> {
    /// Create a new `UpdateSet` with empty `inserts` and `deletes`.
    pub fn new() -> Self {
        Self {
            inserts: HashMap::new(),
            deletes: HashSet::new(),
        }
    }

    /// Schedule the insertion of a `key`-`value` pair.
    ///
    /// This cancels the deletion of `key`, if it has been scheduled using [`delete`](Self::delete).
    pub fn insert(&mut self, key: K, value: V) {
        self.deletes.remove(&key);
        self.inserts.insert(key, value);
    }

    /// Schedule the deletion of `key`.
    ///
    /// This cancels the insertion of `key`, if it has been scheduled using [`insert`](Self::insert).
    pub fn delete(&mut self, key: K) {
        self.inserts.remove(&key);
        self.deletes.insert(key);
    }

    /// Get whether the `UpdateSet` is scheduled to insert a value to `key`, and if so, returns a reference
    /// to that value.
    pub fn get_insert(&self, key: &K) -> Option<&V> {
        self.inserts.get(key)
    }

    /// Check whether the `UpdateSet` is scheduled to delete `key`.
    pub fn contains_delete(&self, key: &K) -> bool {
        self.deletes.contains(key)
    }

    /// Get an iterator over all of the key-value pairs that this `UpdateSet` will insert.
    pub fn inserts(&self) -> hash_map::Iter<K, V> {
        self.inserts.iter()
    }

    /// Get an iterator over all of the keys that this `UpdateSet` will delete.
    pub fn deletes(&self) -> hash_set::Iter<K> {
        self.deletes.iter()
    }

    /// Number of keys touched by this `UpdateSet`.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    /// Apply every update in `later` on top of this `UpdateSet`, as if `later`'s writes happened after
    /// this set's writes.
    pub fn merge(&mut self, later: &UpdateSet<K, V>) {
        for (key, value) in later.inserts() {
            self.insert(key.clone(), value.clone());
        }
        for key in later.deletes() {
            self.delete(key.clone());
        }
    }
}

/// Set of key-value updates to the app state.
pub type AppStateUpdates = UpdateSet<Vec<u8>, Vec<u8>>;
