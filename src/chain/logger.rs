/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Logs every call through the context's [`CallLogger`](crate::context::CallLogger).

use std::time::Instant;

use crate::{
    context::ExecutionContext,
    dispatcher::TxResult,
    errors::TxError,
    store::{KVStore, View},
    types::transaction::Transaction,
};

use super::Next;

pub(super) const NAME: &str = "logger";

pub(super) fn run<K: KVStore>(
    ctx: &ExecutionContext,
    view: &mut View<K>,
    tx: &Transaction,
    next: Next<'_, K>,
) -> Result<TxResult, TxError> {
    let start = Instant::now();
    ctx.logger().debug(format_args!(
        "start, module={}, height={}",
        tx.module(),
        ctx.height()
    ));

    let result = next.run(ctx, view, tx);

    let elapsed = start.elapsed().as_micros();
    match &result {
        Ok(_) => ctx
            .logger()
            .info(format_args!("code=0, elapsed_us={}", elapsed)),
        Err(err) => ctx.logger().info(format_args!(
            "code={}, elapsed_us={}, error={}",
            err.code(),
            elapsed,
            err
        )),
    }
    result
}
