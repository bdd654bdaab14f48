/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`VersionedStore`]: committed snapshots plus the live Check and Deliver views.
//!
//! # Lifecycle
//!
//! Between two commits, the store keeps two views derived from the latest snapshot:
//! 1. The **Check view**, used to decide whether transactions would be admissible. Each check call
//!    works in its own [fork](View::fork) of the Check view, so concurrent check calls never observe each
//!    other's writes. A successful call's writes are folded back with
//!    [`absorb_check`](VersionedStore::absorb_check), so that later check calls see them (e.g., an
//!    advanced nonce). Check writes are never committed.
//! 2. The **Deliver view**, which accumulates the writes of delivered transactions and of genesis.
//!    [`append`](VersionedStore::append) hands out exclusive access to it.
//!
//! [`commit`](VersionedStore::commit) folds the Deliver view into the snapshot at the next height and
//! discards both views.
//!
//! # Serialization of deliver calls and commits
//!
//! The Deliver view lives behind a single mutex. [`DeliverGuard`] holds that mutex for as long as a
//! deliver call runs, and `commit` takes the same mutex, so a commit can never observe half of a
//! delivered transaction and a delivered transaction can never observe a half-committed view. Check
//! calls and queries read committed snapshots by height and never take the Deliver mutex.
//!
//! # Halting
//!
//! A failed commit leaves the views out of sync with durable state. The store records the failure
//! before it releases the Deliver mutex, and from then on [`append`](VersionedStore::append) and
//! [`check`](VersionedStore::check) return [`StoreError::Halted`], including for callers that were
//! already waiting on the mutex.

use std::{
    collections::BTreeSet,
    fmt::{self, Display},
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, RwLock,
    },
};

use crate::types::data_types::{BlockHeight, CryptoHash};

use super::{
    merkle::{MerkleProof, MerkleTree},
    pluggables::{KVGet, KVGetError, KVSetError, KVStore, KVWriteError, Key},
    view::{Snapshot, View},
    write_batch::StoreWriteBatch,
};

pub struct VersionedStore<K: KVStore> {
    kv_store: K,

    // Number of most recent heights kept queryable. `None` keeps every height.
    retain_heights: Option<u64>,

    committed: RwLock<BlockHeight>,
    check: Mutex<Option<View<K>>>,
    deliver: Mutex<View<K>>,
    halted: AtomicBool,
}

impl<K: KVStore> VersionedStore<K> {
    /// Open a versioned store on top of `kv_store`, resuming from whatever height it last committed.
    ///
    /// `retain_heights`, if set, is clamped to at least 1 so the latest snapshot is always retained.
    pub fn open(kv_store: K, retain_heights: Option<u64>) -> Result<Self, StoreError> {
        let committed = kv_store.committed_height()?;
        let deliver = View::new(Snapshot::new(kv_store.clone(), committed));
        Ok(VersionedStore {
            kv_store,
            retain_heights: retain_heights.map(|n| n.max(1)),
            committed: RwLock::new(committed),
            check: Mutex::new(None),
            deliver: Mutex::new(deliver),
            halted: AtomicBool::new(false),
        })
    }

    /// Height of the most recently committed snapshot.
    pub fn committed_height(&self) -> Result<BlockHeight, StoreError> {
        self.committed
            .read()
            .map(|height| *height)
            .map_err(|_| StoreError::Poisoned)
    }

    /// The height the next [`commit`](Self::commit) will produce.
    pub fn working_height(&self) -> Result<BlockHeight, StoreError> {
        Ok(self.committed_height()? + 1)
    }

    /// Lowest height that can still be queried.
    pub fn earliest_retained_height(&self) -> Result<BlockHeight, StoreError> {
        Ok(self.kv_store.earliest_retained()?.max(BlockHeight::new(1)))
    }

    /// Read-only snapshot of the latest committed height.
    pub fn latest_snapshot(&self) -> Result<Snapshot<K>, StoreError> {
        Ok(Snapshot::new(self.kv_store.clone(), self.committed_height()?))
    }

    /// Get a fork of the current Check view, creating the Check view from the latest snapshot if this is
    /// its first use since the last commit.
    pub fn check(&self) -> Result<View<K>, StoreError> {
        let mut check = self.check.lock().map_err(|_| StoreError::Poisoned)?;
        self.ensure_running()?;
        match check.as_ref() {
            Some(view) => Ok(view.fork()),
            None => {
                let view = View::new(self.latest_snapshot()?);
                let fork = view.fork();
                *check = Some(view);
                Ok(fork)
            }
        }
    }

    /// Fold the writes of a successful check call back into the Check view.
    ///
    /// Returns `false` (and drops the writes) if a commit happened after `fork` was handed out.
    pub fn absorb_check(&self, fork: &View<K>) -> Result<bool, StoreError> {
        let mut check = self.check.lock().map_err(|_| StoreError::Poisoned)?;
        match check.as_mut() {
            Some(view) if view.base_height() == fork.base_height() => {
                view.absorb(fork);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Get exclusive access to the Deliver view. The returned guard blocks [`commit`](Self::commit) and
    /// other deliver calls until it is dropped.
    pub fn append(&self) -> Result<DeliverGuard<'_, K>, StoreError> {
        let deliver = self
            .deliver
            .lock()
            .map(DeliverGuard)
            .map_err(|_| StoreError::Poisoned)?;
        // Checked under the lock, so a caller queued behind a failing commit sees the halt.
        self.ensure_running()?;
        Ok(deliver)
    }

    /// Whether a commit has failed. A halted store refuses every later check call, deliver call, and
    /// commit.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<(), StoreError> {
        if self.is_halted() {
            return Err(StoreError::Halted);
        }
        Ok(())
    }

    /// Fold the Deliver view's pending writes into a new snapshot at `committed_height + 1`, record its
    /// Merkle root, discard both views, and return the new height.
    ///
    /// # Errors
    ///
    /// Every error returned by `commit` leaves the in-process views out of sync with durable state, and
    /// [halts](Self::is_halted) the store.
    pub fn commit(&self) -> Result<BlockHeight, CommitError> {
        let deliver = self.append()?;
        self.commit_append(deliver)
    }

    /// Like [`commit`](Self::commit), but for a caller that already holds the Deliver view, so that no
    /// deliver call can slip in between its last write and the commit.
    ///
    /// If this returns an error, the store is [halted](Self::is_halted) before `deliver` is released.
    pub fn commit_append(&self, mut deliver: DeliverGuard<'_, K>) -> Result<BlockHeight, CommitError> {
        let result = self.write_next_height(&mut deliver);
        if result.is_err() {
            self.halted.store(true, Ordering::SeqCst);
        }
        result
    }

    fn write_next_height(&self, deliver: &mut DeliverGuard<'_, K>) -> Result<BlockHeight, CommitError> {
        let current = self.committed_height()?;
        let new_height = current + 1;
        let earliest = self.earliest_after(new_height);
        let updates = deliver.all_writes();

        let mut wb = StoreWriteBatch::<K::WriteBatch>::new();
        let mut live_keys: BTreeSet<Vec<u8>> =
            self.kv_store.key_set(current)?.into_iter().collect();

        for (key, value) in updates.inserts() {
            self.push_version(&mut wb, key, new_height, earliest)?;
            wb.set_value_at(new_height, key, &Some(value.clone()))?;
            live_keys.insert(key.clone());
        }

        for key in updates.deletes() {
            if !live_keys.remove(key) {
                continue;
            }
            self.push_version(&mut wb, key, new_height, earliest)?;
            wb.set_value_at(new_height, key, &None)?;
        }

        let mut leaves = Vec::with_capacity(live_keys.len());
        for key in &live_keys {
            let value = match updates.get_insert(key) {
                Some(value) => value.clone(),
                None => self.kv_store.app_state_at(current, key)?.ok_or(
                    KVGetError::ValueExpectedButNotFound {
                        key: Key::ValueAt {
                            height: current,
                            key: key.clone(),
                        },
                    },
                )?,
            };
            leaves.push((key.clone(), value));
        }
        let root = MerkleTree::from_leaves(leaves.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))).root();

        let keys: Vec<Vec<u8>> = live_keys.into_iter().collect();
        wb.set_key_set(new_height, &keys)?;
        wb.set_state_root(new_height, &root)?;
        wb.set_committed_height(new_height)?;
        if let Some(earliest) = earliest {
            self.prune(&mut wb, earliest)?;
        }

        self.kv_store
            .clone()
            .write(wb.into_inner())
            .map_err(CommitError::Persistence)?;

        {
            let mut check = self.check.lock().map_err(|_| CommitError::Poisoned)?;
            *self.committed.write().map_err(|_| CommitError::Poisoned)? = new_height;
            *check = None;
        }
        *deliver.0 = View::new(Snapshot::new(self.kv_store.clone(), new_height));

        Ok(new_height)
    }

    // Earliest retained height once `new_height` is committed, if that moves the retention window.
    fn earliest_after(&self, new_height: BlockHeight) -> Option<BlockHeight> {
        let retain = self.retain_heights?;
        if new_height.int() <= retain {
            return None;
        }
        Some(BlockHeight::new(new_height.int() + 1 - retain))
    }

    // Append `new_height` to the versions of `key`. Versions older than the newest one at or below
    // `earliest` can no longer be read, so they are dropped together with their values.
    fn push_version(
        &self,
        wb: &mut StoreWriteBatch<K::WriteBatch>,
        key: &[u8],
        new_height: BlockHeight,
        earliest: Option<BlockHeight>,
    ) -> Result<(), CommitError> {
        let mut versions = self.kv_store.key_versions(key)?;
        if let Some(earliest) = earliest {
            let (kept, dropped) = split_versions(versions, earliest);
            for height in dropped {
                wb.delete_value_at(height, key);
            }
            versions = kept;
        }
        versions.push(new_height);
        wb.set_key_versions(key, &versions)?;
        Ok(())
    }

    // Drop the key sets and roots of heights below `new_earliest`.
    fn prune(
        &self,
        wb: &mut StoreWriteBatch<K::WriteBatch>,
        new_earliest: BlockHeight,
    ) -> Result<(), CommitError> {
        let old_earliest = self.earliest_retained_height()?;
        let mut height = old_earliest;
        while height < new_earliest {
            wb.delete_key_set(height);
            wb.delete_state_root(height);
            height += 1;
        }
        wb.set_earliest_retained(new_earliest)?;
        Ok(())
    }

    /// Merkle root of the snapshot at `height`. The pre-genesis height 0 has the empty root.
    pub fn root_at(&self, height: BlockHeight) -> Result<CryptoHash, StoreError> {
        if height == BlockHeight::init() {
            return Ok(CryptoHash::zero());
        }
        self.ensure_available(height)?;
        self.kv_store
            .state_root(height)?
            .ok_or(StoreError::HeightUnavailable {
                requested: height,
                earliest: self.earliest_retained_height()?,
                latest: self.committed_height()?,
            })
    }

    /// Read `key` from the snapshot at `height` (0 means latest), optionally with a Merkle proof rooted
    /// at [`root_at(height)`](Self::root_at).
    pub fn query(
        &self,
        key: &[u8],
        height: BlockHeight,
        prove: bool,
    ) -> Result<StoreQueryResult, StoreError> {
        let height = if height == BlockHeight::init() {
            self.committed_height()?
        } else {
            height
        };
        if height != BlockHeight::init() {
            self.ensure_available(height)?;
        }

        let value = self.kv_store.app_state_at(height, key)?;
        let mut result = StoreQueryResult {
            height,
            key: key.to_vec(),
            value,
            index: None,
            proof: None,
        };
        if result.value.is_none() {
            return Ok(result);
        }

        let keys = self.kv_store.key_set(height)?;
        let index = match keys.binary_search_by(|candidate| candidate.as_slice().cmp(key)) {
            Ok(index) => index,
            Err(_) => {
                return Err(StoreError::KVGetError(KVGetError::ValueExpectedButNotFound {
                    key: Key::KeySet { height },
                }))
            }
        };
        result.index = Some(index as u64);

        if prove {
            let mut leaves = Vec::with_capacity(keys.len());
            for key in &keys {
                let value = self.kv_store.app_state_at(height, key)?.ok_or(
                    KVGetError::ValueExpectedButNotFound {
                        key: Key::ValueAt {
                            height,
                            key: key.clone(),
                        },
                    },
                )?;
                leaves.push((key.clone(), value));
            }
            let tree =
                MerkleTree::from_leaves(leaves.iter().map(|(k, v)| (k.as_slice(), v.as_slice())));
            result.proof = tree.prove(index);
        }

        Ok(result)
    }

    fn ensure_available(&self, height: BlockHeight) -> Result<(), StoreError> {
        let latest = self.committed_height()?;
        let earliest = self.earliest_retained_height()?;
        if height > latest || height < earliest {
            return Err(StoreError::HeightUnavailable {
                requested: height,
                earliest,
                latest,
            });
        }
        Ok(())
    }
}

/// Exclusive handle to the Deliver view. See
/// [serialization of deliver calls and commits](self#serialization-of-deliver-calls-and-commits).
pub struct DeliverGuard<'a, K: KVStore>(MutexGuard<'a, View<K>>);

impl<'a, K: KVStore> Deref for DeliverGuard<'a, K> {
    type Target = View<K>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a, K: KVStore> DerefMut for DeliverGuard<'a, K> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Result of [`VersionedStore::query`].
#[derive(Clone, Debug)]
pub struct StoreQueryResult {
    /// The height that was actually read, i.e., the latest height if 0 was requested.
    pub height: BlockHeight,
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,

    /// Position of `key` among the sorted live keys at `height`, if `key` is live.
    pub index: Option<u64>,
    pub proof: Option<MerkleProof>,
}

/// Split the ascending `versions` of a key into the ones still readable from `earliest` onwards, and the
/// ones that are not.
fn split_versions(
    versions: Vec<BlockHeight>,
    earliest: BlockHeight,
) -> (Vec<BlockHeight>, Vec<BlockHeight>) {
    match versions.iter().rposition(|height| *height <= earliest) {
        Some(base) => {
            let mut kept = versions;
            let dropped: Vec<BlockHeight> = kept.drain(..base).collect();
            (kept, dropped)
        }
        None => (versions, Vec::new()),
    }
}

#[derive(Debug)]
pub enum StoreError {
    KVGetError(KVGetError),

    /// The requested height is newer than the latest committed height, or has been pruned.
    HeightUnavailable {
        requested: BlockHeight,
        earliest: BlockHeight,
        latest: BlockHeight,
    },

    /// A thread panicked while holding one of the store's locks.
    Poisoned,

    /// A commit failed, so the live views no longer match durable state.
    Halted,
}

impl From<KVGetError> for StoreError {
    fn from(value: KVGetError) -> Self {
        StoreError::KVGetError(value)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::KVGetError(err) => write!(f, "{}", err),
            StoreError::HeightUnavailable {
                requested,
                earliest,
                latest,
            } => write!(
                f,
                "height {} unavailable (retained heights are {} to {})",
                requested, earliest, latest
            ),
            StoreError::Poisoned => write!(f, "store lock poisoned"),
            StoreError::Halted => write!(f, "store halted after a failed commit"),
        }
    }
}

/// Error returned by [`VersionedStore::commit`]. All variants are fatal.
#[derive(Debug)]
pub enum CommitError {
    Persistence(KVWriteError),
    KVGetError(KVGetError),
    KVSetError(KVSetError),
    Poisoned,
    Halted,
}

impl From<KVGetError> for CommitError {
    fn from(value: KVGetError) -> Self {
        CommitError::KVGetError(value)
    }
}

impl From<KVSetError> for CommitError {
    fn from(value: KVSetError) -> Self {
        CommitError::KVSetError(value)
    }
}

impl From<StoreError> for CommitError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::KVGetError(err) => CommitError::KVGetError(err),
            StoreError::HeightUnavailable { .. } | StoreError::Poisoned => CommitError::Poisoned,
            StoreError::Halted => CommitError::Halted,
        }
    }
}

impl Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::Persistence(err) => write!(f, "{}", err),
            CommitError::KVGetError(err) => write!(f, "{}", err),
            CommitError::KVSetError(err) => write!(f, "{}", err),
            CommitError::Poisoned => write!(f, "store lock poisoned"),
            CommitError::Halted => write!(f, "store halted after a failed commit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::mem_db::MemDB;

    fn store() -> VersionedStore<MemDB> {
        VersionedStore::open(MemDB::new(), None).unwrap()
    }

    #[test]
    fn fresh_store_starts_at_height_zero() {
        let store = store();
        assert_eq!(store.committed_height().unwrap(), BlockHeight::new(0));
        assert_eq!(store.working_height().unwrap(), BlockHeight::new(1));
        assert_eq!(store.root_at(BlockHeight::init()).unwrap(), CryptoHash::zero());
    }

    #[test]
    fn commit_reflects_exactly_the_delivered_writes() {
        let store = store();
        {
            let mut deliver = store.append().unwrap();
            deliver.set(b"a", b"1");
            deliver.set(b"b", b"2");
            deliver.delete(b"never-existed");
        }
        assert_eq!(store.commit().unwrap(), BlockHeight::new(1));

        let a = store.query(b"a", BlockHeight::init(), false).unwrap();
        assert_eq!(a.value, Some(b"1".to_vec()));
        assert_eq!(a.height, BlockHeight::new(1));
        assert_eq!(a.index, Some(0));
        assert!(store.query(b"never-existed", BlockHeight::init(), false).unwrap().value.is_none());

        // Both views are fresh after commit.
        assert!(store.append().unwrap().pending().is_empty());
        assert!(store.check().unwrap().pending().is_empty());
    }

    #[test]
    fn historical_heights_keep_their_values() {
        let store = store();
        store.append().unwrap().set(b"k", b"v1");
        store.commit().unwrap();
        store.append().unwrap().set(b"k", b"v2");
        store.commit().unwrap();
        store.append().unwrap().delete(b"k");
        store.commit().unwrap();

        let at = |h| store.query(b"k", BlockHeight::new(h), false).unwrap().value;
        assert_eq!(at(1), Some(b"v1".to_vec()));
        assert_eq!(at(2), Some(b"v2".to_vec()));
        assert_eq!(at(3), None);
    }

    #[test]
    fn future_and_pruned_heights_are_unavailable() {
        let store = VersionedStore::open(MemDB::new(), Some(2)).unwrap();
        for i in 0..4u8 {
            store.append().unwrap().set(b"k", &[i]);
            store.commit().unwrap();
        }
        assert_eq!(store.earliest_retained_height().unwrap(), BlockHeight::new(3));
        assert!(matches!(
            store.query(b"k", BlockHeight::new(5), false),
            Err(StoreError::HeightUnavailable { .. })
        ));
        assert!(matches!(
            store.query(b"k", BlockHeight::new(2), false),
            Err(StoreError::HeightUnavailable { .. })
        ));
        assert_eq!(
            store.query(b"k", BlockHeight::new(3), false).unwrap().value,
            Some(vec![2])
        );
    }

    #[test]
    fn pruning_bounds_the_versions_of_hot_keys() {
        let store = VersionedStore::open(MemDB::new(), Some(3)).unwrap();
        for i in 1..=20u8 {
            let mut deliver = store.append().unwrap();
            deliver.set(b"hot", &[i]);
            if i == 1 {
                deliver.set(b"cold", b"c");
            }
            drop(deliver);
            store.commit().unwrap();
        }

        // Heights 18 to 20 are retained, so only the versions written at those heights are needed.
        let versions = store.kv_store.key_versions(b"hot").unwrap();
        assert_eq!(versions, vec![BlockHeight::new(18), BlockHeight::new(19), BlockHeight::new(20)]);
        assert!(store.kv_store.value_at(BlockHeight::new(17), b"hot").is_err());
        assert!(store.kv_store.value_at(BlockHeight::new(1), b"hot").is_err());

        // A key last written before the window still reads at every retained height.
        for h in 18..=20u64 {
            let hot = store.query(b"hot", BlockHeight::new(h), true).unwrap();
            assert_eq!(hot.value, Some(vec![h as u8]));
            let root = store.root_at(BlockHeight::new(h)).unwrap();
            assert!(hot.proof.unwrap().verify(&root, b"hot", &[h as u8]));
            assert_eq!(
                store.query(b"cold", BlockHeight::new(h), false).unwrap().value,
                Some(b"c".to_vec())
            );
        }
    }

    #[test]
    fn versions_below_the_window_keep_the_newest_base() {
        let versions = vec![BlockHeight::new(2), BlockHeight::new(5), BlockHeight::new(9)];

        let (kept, dropped) = split_versions(versions.clone(), BlockHeight::new(6));
        assert_eq!(kept, vec![BlockHeight::new(5), BlockHeight::new(9)]);
        assert_eq!(dropped, vec![BlockHeight::new(2)]);

        let (kept, dropped) = split_versions(versions.clone(), BlockHeight::new(1));
        assert_eq!(kept, versions);
        assert!(dropped.is_empty());
    }

    #[derive(Clone, Default)]
    struct RefusingDB {
        inner: MemDB,
        refusing: Arc<AtomicBool>,
    }

    impl KVStore for RefusingDB {
        type WriteBatch = <MemDB as KVStore>::WriteBatch;

        fn write(&mut self, wb: Self::WriteBatch) -> Result<(), KVWriteError> {
            if self.refusing.load(Ordering::SeqCst) {
                return Err(KVWriteError(String::from("read-only medium")));
            }
            self.inner.write(wb)
        }
    }

    impl KVGet for RefusingDB {
        fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
            self.inner.get(key)
        }
    }

    #[test]
    fn failed_commit_halts_before_releasing_the_deliver_view() {
        let kv = RefusingDB::default();
        let store = VersionedStore::open(kv.clone(), None).unwrap();
        store.append().unwrap().set(b"k", b"v");
        store.commit().unwrap();

        kv.refusing.store(true, Ordering::SeqCst);
        let mut deliver = store.append().unwrap();
        deliver.set(b"k", b"lost");
        assert!(matches!(
            store.commit_append(deliver),
            Err(CommitError::Persistence(_))
        ));

        assert!(store.is_halted());
        assert!(matches!(store.append(), Err(StoreError::Halted)));
        assert!(matches!(store.check(), Err(StoreError::Halted)));
        assert!(matches!(store.commit(), Err(CommitError::Halted)));
        assert_eq!(store.committed_height().unwrap(), BlockHeight::new(1));
    }

    #[test]
    fn proofs_verify_against_recorded_root_at_every_height() {
        let store = store();
        for h in 0..4u8 {
            let mut deliver = store.append().unwrap();
            for i in 0..=h {
                deliver.set(&[b'k', i], &[h, i]);
            }
            drop(deliver);
            store.commit().unwrap();
        }

        for h in 1..=4u64 {
            let root = store.root_at(BlockHeight::new(h)).unwrap();
            let result = store.query(&[b'k', 0], BlockHeight::new(h), true).unwrap();
            let proof = result.proof.unwrap();
            assert!(proof.verify(&root, &[b'k', 0], &result.value.unwrap()));
        }
    }

    #[test]
    fn check_forks_do_not_see_each_other_or_deliver_writes() {
        let store = store();
        store.append().unwrap().set(b"deliver-only", b"x");

        let mut first = store.check().unwrap();
        let mut second = store.check().unwrap();
        first.set(b"first", b"1");
        second.set(b"second", b"2");

        assert!(first.get(b"second").unwrap().is_none());
        assert!(second.get(b"first").unwrap().is_none());
        assert!(first.get(b"deliver-only").unwrap().is_none());

        assert!(store.absorb_check(&first).unwrap());
        assert_eq!(store.check().unwrap().get(b"first").unwrap(), Some(b"1".to_vec()));
        assert!(store.append().unwrap().get(b"first").unwrap().is_none());
    }

    #[test]
    fn check_writes_from_before_a_commit_are_dropped() {
        let store = store();
        let mut stale = store.check().unwrap();
        stale.set(b"k", b"v");
        store.commit().unwrap();
        assert!(!store.absorb_check(&stale).unwrap());
        assert!(store.check().unwrap().get(b"k").unwrap().is_none());
    }

    #[test]
    fn reopening_resumes_from_durable_height() {
        let kv = MemDB::new();
        {
            let store = VersionedStore::open(kv.clone(), None).unwrap();
            store.append().unwrap().set(b"k", b"v");
            store.commit().unwrap();
        }
        let reopened = VersionedStore::open(kv, None).unwrap();
        assert_eq!(reopened.committed_height().unwrap(), BlockHeight::new(1));
        assert_eq!(
            reopened.query(b"k", BlockHeight::init(), false).unwrap().value,
            Some(b"v".to_vec())
        );
    }
}
