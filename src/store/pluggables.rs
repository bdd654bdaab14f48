/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable persistence of committed snapshots.
//!
//! The versioned store only requires that the durable medium behaves like a key-value store with
//! point reads and atomic, batched writes. Implement [`KVStore`] for whatever medium you want and pass
//! it to [`VersionedStore::open`](super::VersionedStore::open).

use std::fmt::{self, Display};

use borsh::BorshDeserialize;

use crate::types::data_types::{BlockHeight, CryptoHash};

use super::variables::{self, concat};

pub trait KVStore: KVGet + Clone + Send + Sync + 'static {
    type WriteBatch: WriteBatch;

    /// Atomically apply every write in `wb`. Either all of them become durable or none do.
    fn write(&mut self, wb: Self::WriteBatch) -> Result<(), KVWriteError>;
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /* ↓↓↓ Committed Height ↓↓↓ */

    fn committed_height(&self) -> Result<BlockHeight, KVGetError> {
        match self.get(&variables::COMMITTED_HEIGHT) {
            Some(bytes) => BlockHeight::deserialize(&mut &*bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::CommittedHeight,
                    source: err,
                }
            }),
            None => Ok(BlockHeight::init()),
        }
    }

    /* ↓↓↓ Earliest Retained Height ↓↓↓ */

    fn earliest_retained(&self) -> Result<BlockHeight, KVGetError> {
        match self.get(&variables::EARLIEST_RETAINED) {
            Some(bytes) => BlockHeight::deserialize(&mut &*bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::EarliestRetained,
                    source: err,
                }
            }),
            None => Ok(BlockHeight::init()),
        }
    }

    /* ↓↓↓ Key Versions ↓↓↓ */

    fn key_versions(&self, key: &[u8]) -> Result<Vec<BlockHeight>, KVGetError> {
        match self.get(&concat(&variables::KEY_VERSIONS, key)) {
            Some(bytes) => Vec::<BlockHeight>::deserialize(&mut &*bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::KeyVersions { key: key.to_vec() },
                    source: err,
                }
            }),
            None => Ok(Vec::new()),
        }
    }

    /* ↓↓↓ Value At ↓↓↓ */

    fn value_at(&self, height: BlockHeight, key: &[u8]) -> Result<Option<Vec<u8>>, KVGetError> {
        let bytes = self.get(&value_at_key(height, key)).ok_or(
            KVGetError::ValueExpectedButNotFound {
                key: Key::ValueAt {
                    height,
                    key: key.to_vec(),
                },
            },
        )?;
        Option::<Vec<u8>>::deserialize(&mut &*bytes).map_err(|err| {
            KVGetError::DeserializeValueError {
                key: Key::ValueAt {
                    height,
                    key: key.to_vec(),
                },
                source: err,
            }
        })
    }

    /// Get the value of `key` in the snapshot at `height`: the value written by the most recent version
    /// of `key` at or below `height`.
    fn app_state_at(&self, height: BlockHeight, key: &[u8]) -> Result<Option<Vec<u8>>, KVGetError> {
        let versions = self.key_versions(key)?;
        match versions.iter().rev().find(|version| **version <= height) {
            Some(version) => self.value_at(*version, key),
            None => Ok(None),
        }
    }

    /* ↓↓↓ Key Set ↓↓↓ */

    fn key_set(&self, height: BlockHeight) -> Result<Vec<Vec<u8>>, KVGetError> {
        if height == BlockHeight::init() {
            return Ok(Vec::new());
        }
        Vec::<Vec<u8>>::deserialize(
            &mut &*self
                .get(&concat(&variables::KEY_SET, &height.to_be_bytes()))
                .ok_or(KVGetError::ValueExpectedButNotFound {
                    key: Key::KeySet { height },
                })?,
        )
        .map_err(|err| KVGetError::DeserializeValueError {
            key: Key::KeySet { height },
            source: err,
        })
    }

    /* ↓↓↓ State Root ↓↓↓ */

    fn state_root(&self, height: BlockHeight) -> Result<Option<CryptoHash>, KVGetError> {
        if let Some(bytes) = self.get(&concat(&variables::STATE_ROOT, &height.to_be_bytes())) {
            Ok(Some(CryptoHash::deserialize(&mut &*bytes).map_err(
                |err| KVGetError::DeserializeValueError {
                    key: Key::StateRoot { height },
                    source: err,
                },
            )?))
        } else {
            Ok(None)
        }
    }
}

pub(crate) fn value_at_key(height: BlockHeight, key: &[u8]) -> Vec<u8> {
    concat(&concat(&variables::VALUE_AT, &height.to_be_bytes()), key)
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}

/// Error when trying to read a value corresponding to a given key from the [key value store][KVStore].
/// The error may arise in the following circumstances:
/// 1. The value corresponding to a given key cannot be deserialized into its expected type,
/// 2. The value corresponding to a given key cannot be found, even though an invariant of the store
///    says it must exist.
#[derive(Debug)]
pub enum KVGetError {
    DeserializeValueError { key: Key, source: std::io::Error },
    ValueExpectedButNotFound { key: Key },
}

impl Display for KVGetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KVGetError::DeserializeValueError { key, source } => {
                write!(f, "failed to deserialize {}: {}", key, source)
            }
            KVGetError::ValueExpectedButNotFound { key } => {
                write!(f, "{} expected but not found", key)
            }
        }
    }
}

/// Error when trying to serialize a value before setting it into a write batch.
#[derive(Debug)]
pub enum KVSetError {
    SerializeValueError { key: Key, source: std::io::Error },
}

impl Display for KVSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KVSetError::SerializeValueError { key, source } => {
                write!(f, "failed to serialize {}: {}", key, source)
            }
        }
    }
}

/// Error returned by a [`KVStore`] that could not durably apply a write batch.
#[derive(Debug)]
pub struct KVWriteError(pub String);

impl Display for KVWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "durable write failed: {}", self.0)
    }
}

#[derive(Debug)]
pub enum Key {
    CommittedHeight,
    EarliestRetained,
    KeyVersions { key: Vec<u8> },
    ValueAt { height: BlockHeight, key: Vec<u8> },
    KeySet { height: BlockHeight },
    StateRoot { height: BlockHeight },

    /// A key of the app state itself, read by a module.
    AppState { key: Vec<u8> },
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::CommittedHeight => write!(f, "Committed Height"),
            Key::EarliestRetained => write!(f, "Earliest Retained Height"),
            Key::KeyVersions { key } => write!(f, "Key Versions for key {:?}", key),
            Key::ValueAt { height, key } => {
                write!(f, "Value At height {} for key {:?}", height, key)
            }
            Key::KeySet { height } => write!(f, "Key Set at height {}", height),
            Key::StateRoot { height } => write!(f, "State Root at height {}", height),
            Key::AppState { key } => write!(f, "App State for key {:?}", key),
        }
    }
}
