/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use crate::{
    context::{CallKind, ExecutionContext},
    dispatcher::TxResult,
    errors::TxError,
    store::{KVStore, View},
    types::transaction::Transaction,
};

use super::Next;

pub(super) const NAME: &str = "checkpoint";

pub(super) fn run<K: KVStore>(
    on_check: bool,
    on_deliver: bool,
    ctx: &ExecutionContext,
    view: &mut View<K>,
    tx: &Transaction,
    next: Next<'_, K>,
) -> Result<TxResult, TxError> {
    let enabled = match ctx.kind() {
        CallKind::Check => on_check,
        CallKind::Deliver => on_deliver,
    };
    if !enabled {
        return next.run(ctx, view, tx);
    }

    let checkpoint = view.checkpoint();
    let result = next.run(ctx, view, tx);
    if let Err(err) = &result {
        ctx.logger()
            .debug(format_args!("rolling back to checkpoint: {}", err));
        view.rollback(checkpoint);
    }
    result
}
