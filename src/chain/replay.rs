/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Replay protection.
//!
//! Each distinct set of signers has a sequence number in the app state, starting at 0. A transaction
//! must carry a [nonce](crate::types::transaction::Nonce) whose signers have all signed it and whose
//! sequence is exactly one more than the stored sequence. The stage then stores the new sequence, so the
//! same transaction can never pass twice.

use borsh::BorshSerialize;

use crate::{
    context::ExecutionContext,
    dispatcher::TxResult,
    errors::TxError,
    modules,
    store::{KVStore, View},
    types::{
        data_types::{Actor, CryptoHash},
        transaction::Transaction,
    },
};

use super::Next;

pub(super) const NAME: &str = "replay_check";

const SEQUENCE_PREFIX: &[u8] = b"sigs/sequence/";

/// Last sequence number used by `signers`, or 0 if they have never transacted together.
pub fn sequence<K: KVStore>(view: &View<K>, signers: &[Actor]) -> Result<u64, TxError> {
    Ok(modules::read::<K, u64>(view, &sequence_key(signers)?)?.unwrap_or(0))
}

// The order signers are listed in does not matter.
fn sequence_key(signers: &[Actor]) -> Result<Vec<u8>, TxError> {
    let mut signers = signers.to_vec();
    signers.sort();
    signers.dedup();
    let bytes = signers
        .try_to_vec()
        .map_err(|err| TxError::InternalFault(err.to_string()))?;

    let mut key = SEQUENCE_PREFIX.to_vec();
    key.extend_from_slice(&CryptoHash::digest(&bytes).bytes());
    Ok(key)
}

pub(super) fn run<K: KVStore>(
    ctx: &ExecutionContext,
    view: &mut View<K>,
    tx: &Transaction,
    next: Next<'_, K>,
) -> Result<TxResult, TxError> {
    let nonce = tx
        .envelope
        .nonce
        .as_ref()
        .ok_or_else(|| TxError::rejected(NAME, "transaction carries no nonce"))?;

    if nonce.signers.is_empty() {
        return Err(TxError::rejected(NAME, "nonce names no signers"));
    }
    if let Some(missing) = nonce.signers.iter().find(|signer| !ctx.has_permission(signer)) {
        return Err(TxError::rejected(
            NAME,
            format!("nonce signer {} has not signed", missing),
        ));
    }

    let key = sequence_key(&nonce.signers)?;
    let stored = modules::read::<K, u64>(view, &key)?.unwrap_or(0);
    if nonce.sequence != stored + 1 {
        return Err(TxError::rejected(
            NAME,
            format!("expected sequence {}, got {}", stored + 1, nonce.sequence),
        ));
    }
    modules::write(view, &key, &nonce.sequence)?;

    next.run(ctx, view, tx)
}
