/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Built-in handler modules.
//!
//! - [`coin`]: balances and transfers. Also provides the [`Bank`](coin::Bank) the
//!   [`Fee`](crate::chain::Stage::Fee) stage charges fees through.
//! - [`roles`]: named multi-signature roles, checked by the [`Roles`](crate::chain::Stage::Roles) stage.
//!
//! Each module keeps its state under its own key prefix in the app state, and stores values as Borsh.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::store::{
    pluggables::{KVGetError, KVSetError, Key},
    KVStore, View,
};

pub mod coin;

pub mod roles;

/// Read and deserialize the value at `key`.
pub(crate) fn read<K: KVStore, T: BorshDeserialize>(
    view: &View<K>,
    key: &[u8],
) -> Result<Option<T>, KVGetError> {
    match view.get(key)? {
        Some(bytes) => T::try_from_slice(&bytes)
            .map(Some)
            .map_err(|err| KVGetError::DeserializeValueError {
                key: Key::AppState { key: key.to_vec() },
                source: err,
            }),
        None => Ok(None),
    }
}

/// Serialize `value` and write it at `key`.
pub(crate) fn write<K: KVStore, T: BorshSerialize>(
    view: &mut View<K>,
    key: &[u8],
    value: &T,
) -> Result<(), KVSetError> {
    let bytes = value
        .try_to_vec()
        .map_err(|err| KVSetError::SerializeValueError {
            key: Key::AppState { key: key.to_vec() },
            source: err,
        })?;
    view.set(key, &bytes);
    Ok(())
}
