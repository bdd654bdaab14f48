/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Typed setters over a user-provided [`WriteBatch`].

use borsh::BorshSerialize;

use crate::types::data_types::{BlockHeight, CryptoHash};

use super::pluggables::{value_at_key, KVSetError, Key, WriteBatch};
use super::variables::{self, concat};

/// Wraps a [`WriteBatch`] and puts each store variable at the key path listed in
/// [`variables`](super::variables).
pub struct StoreWriteBatch<W: WriteBatch>(pub(super) W);

impl<W: WriteBatch> StoreWriteBatch<W> {
    pub(crate) fn new() -> StoreWriteBatch<W> {
        StoreWriteBatch(W::new())
    }

    pub(crate) fn into_inner(self) -> W {
        self.0
    }

    /* ↓↓↓ Committed Height ↓↓↓ */

    pub fn set_committed_height(&mut self, height: BlockHeight) -> Result<(), KVSetError> {
        self.0.set(
            &variables::COMMITTED_HEIGHT,
            &height
                .try_to_vec()
                .map_err(|err| KVSetError::SerializeValueError {
                    key: Key::CommittedHeight,
                    source: err,
                })?,
        );
        Ok(())
    }

    /* ↓↓↓ Earliest Retained Height ↓↓↓ */

    pub fn set_earliest_retained(&mut self, height: BlockHeight) -> Result<(), KVSetError> {
        self.0.set(
            &variables::EARLIEST_RETAINED,
            &height
                .try_to_vec()
                .map_err(|err| KVSetError::SerializeValueError {
                    key: Key::EarliestRetained,
                    source: err,
                })?,
        );
        Ok(())
    }

    /* ↓↓↓ Key Versions ↓↓↓ */

    pub fn set_key_versions(
        &mut self,
        key: &[u8],
        versions: &Vec<BlockHeight>,
    ) -> Result<(), KVSetError> {
        self.0.set(
            &concat(&variables::KEY_VERSIONS, key),
            &versions
                .try_to_vec()
                .map_err(|err| KVSetError::SerializeValueError {
                    key: Key::KeyVersions { key: key.to_vec() },
                    source: err,
                })?,
        );
        Ok(())
    }

    /* ↓↓↓ Value At ↓↓↓ */

    pub fn set_value_at(
        &mut self,
        height: BlockHeight,
        key: &[u8],
        value: &Option<Vec<u8>>,
    ) -> Result<(), KVSetError> {
        self.0.set(
            &value_at_key(height, key),
            &value
                .try_to_vec()
                .map_err(|err| KVSetError::SerializeValueError {
                    key: Key::ValueAt {
                        height,
                        key: key.to_vec(),
                    },
                    source: err,
                })?,
        );
        Ok(())
    }

    pub fn delete_value_at(&mut self, height: BlockHeight, key: &[u8]) {
        self.0.delete(&value_at_key(height, key));
    }

    /* ↓↓↓ Key Set ↓↓↓ */

    pub fn set_key_set(&mut self, height: BlockHeight, keys: &Vec<Vec<u8>>) -> Result<(), KVSetError> {
        self.0.set(
            &concat(&variables::KEY_SET, &height.to_be_bytes()),
            &keys
                .try_to_vec()
                .map_err(|err| KVSetError::SerializeValueError {
                    key: Key::KeySet { height },
                    source: err,
                })?,
        );
        Ok(())
    }

    pub fn delete_key_set(&mut self, height: BlockHeight) {
        self.0
            .delete(&concat(&variables::KEY_SET, &height.to_be_bytes()));
    }

    /* ↓↓↓ State Root ↓↓↓ */

    pub fn set_state_root(&mut self, height: BlockHeight, root: &CryptoHash) -> Result<(), KVSetError> {
        self.0.set(
            &concat(&variables::STATE_ROOT, &height.to_be_bytes()),
            &root
                .try_to_vec()
                .map_err(|err| KVSetError::SerializeValueError {
                    key: Key::StateRoot { height },
                    source: err,
                })?,
        );
        Ok(())
    }

    pub fn delete_state_root(&mut self, height: BlockHeight) {
        self.0
            .delete(&concat(&variables::STATE_ROOT, &height.to_be_bytes()));
    }
}
