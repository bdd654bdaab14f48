/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    context::ExecutionContext,
    dispatcher::TxResult,
    errors::TxError,
    store::{KVStore, View},
    types::transaction::Transaction,
};

use super::Next;

pub(super) const NAME: &str = "recovery";

pub(super) fn run<K: KVStore>(
    ctx: &ExecutionContext,
    view: &mut View<K>,
    tx: &Transaction,
    next: Next<'_, K>,
) -> Result<TxResult, TxError> {
    let checkpoint = view.checkpoint();
    match panic::catch_unwind(AssertUnwindSafe(|| next.run(ctx, view, tx))) {
        Ok(result) => result,
        Err(payload) => {
            view.rollback(checkpoint);
            let reason = panic_message(payload.as_ref());
            ctx.logger()
                .warn(format_args!("recovered from panic: {}", reason));
            Err(TxError::InternalFault(reason))
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("panic with a non-string payload")
    }
}
