/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Versioned, Merkle-authenticated app state.
//!
//! The app state is a sequence of immutable [snapshots](Snapshot), one per committed height, plus two
//! live [views](View) of uncommitted writes. See [`VersionedStore`] for the lifecycle of the views, and
//! [`variables`] for how snapshots are laid out in the user-provided [`KVStore`].

pub mod merkle;

pub mod mem_db;

pub mod pluggables;

pub mod variables;

pub mod versioned_store;

pub mod view;

pub mod write_batch;

pub use mem_db::MemDB;
pub use merkle::MerkleProof;
pub use pluggables::{KVGet, KVGetError, KVStore, KVWriteError, Key, WriteBatch};
pub use versioned_store::{CommitError, DeliverGuard, StoreError, StoreQueryResult, VersionedStore};
pub use view::{Snapshot, View, ViewCheckpoint};
