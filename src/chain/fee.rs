/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fee collection.
//!
//! With a [fee](crate::types::transaction::Fee) attached, its denomination must match the configured
//! minimum fee's and its amount must be at least the minimum. The payer must have authorized the
//! transaction (directly as a signer, or through a role), and the fee is moved from the payer to the
//! collector through the coin module's [`Bank`]. Without a fee attached, a transaction only passes if
//! the minimum is zero.

use crate::{
    context::ExecutionContext,
    dispatcher::TxResult,
    errors::TxError,
    modules::coin::{Bank, BankError},
    store::{KVStore, View},
    types::{
        data_types::{Actor, Coin},
        transaction::Transaction,
    },
};

use super::Next;

pub(super) const NAME: &str = "fee";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeConfig {
    pub min_fee: Coin,

    /// Account every fee is paid into.
    pub collector: Actor,
}

impl FeeConfig {
    pub fn new(min_fee: Coin, collector: Actor) -> FeeConfig {
        FeeConfig { min_fee, collector }
    }
}

pub(super) fn run<K: KVStore>(
    config: &FeeConfig,
    ctx: &ExecutionContext,
    view: &mut View<K>,
    tx: &Transaction,
    next: Next<'_, K>,
) -> Result<TxResult, TxError> {
    let Some(fee) = &tx.envelope.fee else {
        if config.min_fee.amount > 0 {
            return Err(TxError::rejected(
                NAME,
                format!("a fee of at least {} is required", config.min_fee),
            ));
        }
        return next.run(ctx, view, tx);
    };

    if fee.amount.denom != config.min_fee.denom {
        return Err(TxError::rejected(
            NAME,
            format!(
                "fees are paid in {}, not {}",
                config.min_fee.denom, fee.amount.denom
            ),
        ));
    }
    if fee.amount.amount < config.min_fee.amount {
        return Err(TxError::rejected(
            NAME,
            format!("fee {} is below the minimum {}", fee.amount, config.min_fee),
        ));
    }
    if !ctx.has_permission(&fee.payer) {
        return Err(TxError::rejected(
            NAME,
            format!("fee payer {} has not authorized this transaction", fee.payer),
        ));
    }

    if fee.amount.amount > 0 {
        Bank::transfer(view, &fee.payer, &config.collector, &fee.amount).map_err(
            |err| match err {
                BankError::KVGetError(err) => TxError::from(err),
                BankError::KVSetError(err) => TxError::from(err),
                other => TxError::rejected(NAME, other.to_string()),
            },
        )?;
        ctx.logger()
            .debug(format_args!("charged {} to {}", fee.amount, fee.payer));
    }

    next.run(ctx, view, tx)
}
