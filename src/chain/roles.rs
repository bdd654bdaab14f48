/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use crate::{
    context::ExecutionContext,
    dispatcher::TxResult,
    errors::TxError,
    modules::roles::load_role,
    store::{KVStore, View},
    types::transaction::Transaction,
};

use super::Next;

pub(super) const NAME: &str = "roles";

pub(super) fn run<K: KVStore>(
    ctx: &ExecutionContext,
    view: &mut View<K>,
    tx: &Transaction,
    next: Next<'_, K>,
) -> Result<TxResult, TxError> {
    if tx.envelope.roles.is_empty() {
        return next.run(ctx, view, tx);
    }

    let mut granted = Vec::with_capacity(tx.envelope.roles.len());
    for name in &tx.envelope.roles {
        let role = load_role(view, name)?
            .ok_or_else(|| TxError::rejected(NAME, format!("no role named {}", name)))?;
        if !role.is_satisfied_by(ctx.permissions()) {
            return Err(TxError::rejected(
                NAME,
                format!("role {} needs {} member signatures", name, role.min_sigs),
            ));
        }
        granted.push(role.actor());
    }

    next.run(&ctx.with_permissions(granted), view, tx)
}
