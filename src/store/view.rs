/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Snapshots and the mutable views layered on top of them.
//!
//! # Snapshots
//!
//! A [`Snapshot`] is a read-only handle to the app state as it was committed at one height. Since
//! committed heights never change, a snapshot stays valid (and keeps returning the same values) while
//! later heights are committed, up until its height is pruned.
//!
//! # Views
//!
//! A [`View`] is a [`Snapshot`] plus a set of pending writes. Reads consult the pending writes first
//! and fall back to the snapshot. The versioned store keeps two families of views, the Check view and
//! the Deliver view, which are derived from the same snapshot but never share pending writes.

use crate::types::{data_types::BlockHeight, update_sets::AppStateUpdates};

use super::pluggables::{KVGet, KVGetError, KVStore};

/// Read-only view of the app state at a committed height.
#[derive(Clone)]
pub struct Snapshot<K: KVStore> {
    kv_store: K,
    height: BlockHeight,
}

impl<K: KVStore> Snapshot<K> {
    pub(crate) fn new(kv_store: K, height: BlockHeight) -> Self {
        Snapshot { kv_store, height }
    }

    pub fn height(&self) -> BlockHeight {
        self.height
    }

    /// Get the value associated with `key` at this snapshot's height.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVGetError> {
        self.kv_store.app_state_at(self.height, key)
    }
}

/// A snapshot plus pending, uncommitted writes.
#[derive(Clone)]
pub struct View<K: KVStore> {
    base: Snapshot<K>,

    // Frozen copy of the writes of the view this one was forked from, if any.
    inherited: Option<AppStateUpdates>,

    pending: AppStateUpdates,
}

/// Saved copy of a view's pending writes, used to undo everything written after it was taken.
#[derive(Clone)]
pub struct ViewCheckpoint(AppStateUpdates);

impl<K: KVStore> View<K> {
    /// Create a view with no pending writes on top of `base`.
    pub fn new(base: Snapshot<K>) -> Self {
        View {
            base,
            inherited: None,
            pending: AppStateUpdates::new(),
        }
    }

    /// Get the value associated with `key`, taking pending writes into account.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVGetError> {
        let key_vec = key.to_vec();
        for updates in std::iter::once(&self.pending).chain(self.inherited.iter()) {
            if updates.contains_delete(&key_vec) {
                return Ok(None);
            }
            if let Some(value) = updates.get_insert(&key_vec) {
                return Ok(Some(value.clone()));
            }
        }
        self.base.get(key)
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        self.pending.insert(key.to_vec(), value.to_vec());
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.pending.delete(key.to_vec());
    }

    /// Height of the snapshot this view was derived from.
    pub fn base_height(&self) -> BlockHeight {
        self.base.height()
    }

    /// Writes made through this view. For a [fork](Self::fork), this excludes the writes it inherited.
    pub fn pending(&self) -> &AppStateUpdates {
        &self.pending
    }

    pub fn checkpoint(&self) -> ViewCheckpoint {
        ViewCheckpoint(self.pending.clone())
    }

    /// Discard every write made after `checkpoint` was taken.
    pub fn rollback(&mut self, checkpoint: ViewCheckpoint) {
        self.pending = checkpoint.0;
    }

    /// Create an independent copy of this view. Writes to the fork are invisible to this view until
    /// they are [absorbed](Self::absorb).
    pub fn fork(&self) -> View<K> {
        View {
            base: self.base.clone(),
            inherited: Some(self.all_writes()),
            pending: AppStateUpdates::new(),
        }
    }

    /// Apply the writes made through `fork` on top of this view's pending writes.
    pub fn absorb(&mut self, fork: &View<K>) {
        self.pending.merge(&fork.pending);
    }

    /// Inherited writes overlaid with this view's own writes.
    pub(crate) fn all_writes(&self) -> AppStateUpdates {
        let mut writes = self.inherited.clone().unwrap_or_default();
        writes.merge(&self.pending);
        writes
    }
}
