/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes that specify where each versioned store variable is stored in the user-provided
//! key-value store.
//!
//! # List of State Variables
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Committed Height|[`BlockHeight`]|Height of the most recently committed snapshot. Absent before the first commit, which is read as height 0.|
//! |Earliest Retained Height|[`BlockHeight`]|Lowest height that can still be queried. Heights below it have been pruned.|
//! |Key Versions|`Vec<u8>` -> `Vec<BlockHeight>`|For each app state key, the ascending list of heights at which the key was written or deleted.|
//! |Value At|([`BlockHeight`], `Vec<u8>`) -> `Option<Vec<u8>>`|The value a key took at a height listed in its key versions. `None` records a deletion.|
//! |Key Set|[`BlockHeight`] -> `Vec<Vec<u8>>`|The sorted list of keys that are live in the snapshot at a height.|
//! |State Root|[`BlockHeight`] -> [`CryptoHash`]|The Merkle root over the live key-value pairs of the snapshot at a height.|
//!
//! # Persistence of state variables
//!
//! Every variable is stored as a **Borsh-serialized value**. Single values (committed height, earliest
//! retained height) are stored at their one-byte constant key. Mappings are stored at the concatenation
//! of their one-byte prefix and the key of the mapping. Heights inside keys are encoded
//! [big-endian](crate::types::data_types::BlockHeight::to_be_bytes) so that they are fixed-width, which
//! keeps `VALUE_AT + height + key` unambiguous for keys of any length.
//!
//! [`BlockHeight`]: crate::types::data_types::BlockHeight
//! [`CryptoHash`]: crate::types::data_types::CryptoHash

// State variables
pub const COMMITTED_HEIGHT: [u8; 1] = [0];
pub const EARLIEST_RETAINED: [u8; 1] = [1];
pub const KEY_VERSIONS: [u8; 1] = [2];
pub const VALUE_AT: [u8; 1] = [3];
pub const KEY_SET: [u8; 1] = [4];
pub const STATE_ROOT: [u8; 1] = [5];

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}
