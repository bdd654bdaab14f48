/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use crate::{
    context::ExecutionContext,
    dispatcher::TxResult,
    errors::TxError,
    store::{KVStore, View},
    types::transaction::Transaction,
};

use super::Next;

pub(super) const NAME: &str = "chain_guard";

pub(super) fn run<K: KVStore>(
    ctx: &ExecutionContext,
    view: &mut View<K>,
    tx: &Transaction,
    next: Next<'_, K>,
) -> Result<TxResult, TxError> {
    if tx.envelope.chain_id != ctx.chain_id() {
        return Err(TxError::rejected(
            NAME,
            format!(
                "signed for chain {}, this is chain {}",
                tx.envelope.chain_id,
                ctx.chain_id()
            ),
        ));
    }

    // A transaction is still valid at exactly its expiry height.
    if let Some(expires_at) = tx.envelope.expires_at {
        if expires_at < ctx.height() {
            return Err(TxError::rejected(
                NAME,
                format!("expired at height {}, now {}", expires_at, ctx.height()),
            ));
        }
    }

    next.run(ctx, view, tx)
}
