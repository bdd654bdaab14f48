/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::{Add, AddAssign, Sub},
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};

use super::crypto_primitives::{CryptoHasher, Digest, VerifyingKey};

/// Number that uniquely identifies a blockchain.
///
/// Every transaction carries the `ChainID` it was signed for, and the
/// [`ChainGuard`](crate::chain::Stage::ChainGuard) stage rejects transactions whose `ChainID` differs from
/// the one the node was [configured](crate::node::Configuration) with. This stops a transaction signed
/// for one chain from being replayed on another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct ChainID(u64);

impl ChainID {
    /// Create a new `ChainID` with an `int` value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the `u64` value of this `ChainID`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for ChainID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Height of a committed snapshot of the app state.
///
/// Height 0 is the empty state that exists before genesis is committed. Every
/// [`commit`](crate::store::VersionedStore::commit) produces the snapshot at the next height.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// The height of the empty, pre-genesis state.
    pub const fn init() -> Self {
        Self(0)
    }

    /// Get the inner `u64` value of this `BlockHeight`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the big-endian representation of the inner `u64` value of this `BlockHeight`.
    ///
    /// Big-endian is used in storage keys so that heights sort in numeric order.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl AddAssign<u64> for BlockHeight {
    fn add_assign(&mut self, rhs: u64) {
        self.0.add_assign(rhs)
    }
}

impl Add<u64> for BlockHeight {
    type Output = BlockHeight;
    fn add(self, rhs: u64) -> Self::Output {
        BlockHeight::new(self.0.add(rhs))
    }
}

impl Sub<BlockHeight> for BlockHeight {
    type Output = u64;
    fn sub(self, rhs: BlockHeight) -> Self::Output {
        self.0 - rhs.0
    }
}

/// 32-byte SHA256 hash.
///
/// Used for Merkle roots and nodes, transaction hashes, and account addresses derivation.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zeroes hash.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Hash `bytes` with SHA256.
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = CryptoHasher::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Get the inner `[u8; 32]` value of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Name of the module a transaction or genesis entry is addressed to, e.g., `"coin"`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct ModuleTag(String);

impl ModuleTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ModuleTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for ModuleTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleTag({})", self.0)
    }
}

impl From<&str> for ModuleTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Length of an [`Address`] derived from a verifying key.
pub const ADDRESS_LEN: usize = 20;

/// Opaque account identifier inside the namespace of one module.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct Address(Vec<u8>);

impl Address {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The address of the holder of `verifying_key`: the first [`ADDRESS_LEN`] bytes of the SHA256 hash
    /// of the key.
    pub fn from_verifying_key(verifying_key: &VerifyingKey) -> Self {
        let hash = CryptoHash::digest(verifying_key.as_bytes());
        Self(hash.bytes()[..ADDRESS_LEN].to_vec())
    }

    /// Decode an address from its printable (unpadded base64url) form.
    pub fn from_base64url(encoded: &str) -> Result<Self, base64::DecodeError> {
        URL_SAFE_NO_PAD.decode(encoded).map(Self)
    }

    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64url())
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base64url())
    }
}

/// A principal that can be granted permission during a call: an [`Address`] qualified by the module
/// (`app`) that vouches for it.
///
/// For example, the [`Signatures`](crate::chain::Stage::Signatures) stage grants
/// `Actor { app: "sigs", address: <signer address> }` for every valid signature on a transaction, and the
/// [`Roles`](crate::chain::Stage::Roles) stage grants `Actor { app: "role", address: <role name> }` for
/// every role whose threshold is met.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize)]
pub struct Actor {
    pub app: ModuleTag,
    pub address: Address,
}

impl Actor {
    pub fn new(app: impl Into<ModuleTag>, address: Address) -> Self {
        Self {
            app: app.into(),
            address,
        }
    }

    /// Storage-friendly encoding: `app`, a `/` separator, then the raw address bytes.
    pub fn key_bytes(&self) -> Vec<u8> {
        let mut bytes = self.app.as_str().as_bytes().to_vec();
        bytes.push(b'/');
        bytes.extend_from_slice(self.address.bytes());
        bytes
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.app, self.address)
    }
}

impl Debug for Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Actor({}:{})", self.app, self.address)
    }
}

/// An amount of a single denomination.
#[derive(Clone, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}
