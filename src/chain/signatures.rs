/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signature verification.
//!
//! Every signature must verify over the envelope's [sign bytes](crate::types::transaction::Envelope::sign_bytes),
//! and at least one is required. For each signature, the stage grants the signer actor
//! `Actor { app: SIGS, address: Address::from_verifying_key(..) }`.

use crate::{
    context::ExecutionContext,
    dispatcher::TxResult,
    errors::TxError,
    store::{KVStore, View},
    types::{
        crypto_primitives::VerifyingKey,
        data_types::{Actor, Address},
        transaction::Transaction,
    },
};

use super::Next;

pub(super) const NAME: &str = "signatures";

/// The `app` of actors granted for valid signatures.
pub const SIGS: &str = "sigs";

/// The actor granted to the holder of `verifying_key`.
pub fn signer_actor(verifying_key: &VerifyingKey) -> Actor {
    Actor::new(SIGS, Address::from_verifying_key(verifying_key))
}

pub(super) fn run<K: KVStore>(
    ctx: &ExecutionContext,
    view: &mut View<K>,
    tx: &Transaction,
    next: Next<'_, K>,
) -> Result<TxResult, TxError> {
    if tx.signatures.is_empty() {
        return Err(TxError::rejected(NAME, "transaction is unsigned"));
    }

    let message = tx
        .envelope
        .sign_bytes()
        .map_err(|err| TxError::MalformedInput(err.to_string()))?;

    let mut signers = Vec::with_capacity(tx.signatures.len());
    for (i, signature) in tx.signatures.iter().enumerate() {
        let verifying_key = signature.verify(&message).map_err(|err| {
            TxError::rejected(NAME, format!("signature {} is invalid: {}", i, err))
        })?;
        signers.push(signer_actor(&verifying_key));
    }

    next.run(&ctx.with_permissions(signers), view, tx)
}
