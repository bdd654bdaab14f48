/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Balances of single-denomination coins held by [actors](Actor), and transfers between them.
//!
//! ## Genesis
//!
//! A genesis entry for this module credits one account. Its key is the base64url (unpadded) encoding of
//! the account's [address](Address), which is credited as a signer actor (`sigs:<address>`). Its value
//! is an amount followed by an optional denomination, e.g., `"1000"` or `"1000atom"`. Entries without a
//! denomination are credited in the handler's default denomination.
//!
//! ## State
//!
//! The balance of `owner` in `denom` is the Borsh-serialized `u64` at
//! `coin/balance/<denom>/<owner.key_bytes()>`. A missing key means a zero balance.

use std::fmt::{self, Display};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    chain::signatures::SIGS,
    context::ExecutionContext,
    dispatcher::{Handler, TxResult},
    errors::HandlerError,
    store::{
        pluggables::{KVGetError, KVSetError},
        KVStore, View,
    },
    types::{
        data_types::{Actor, Address, Coin, ModuleTag},
        transaction::Transaction,
    },
};

pub const COIN: &str = "coin";

const BALANCE_PREFIX: &[u8] = b"coin/balance/";

/// Transactions understood by the coin module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum CoinTx {
    /// Move `amount` from `from` to `to`. `from` must have authorized the transaction.
    Send { from: Actor, to: Actor, amount: Coin },
}

pub struct CoinHandler {
    default_denom: String,
}

impl CoinHandler {
    pub fn new(default_denom: impl Into<String>) -> CoinHandler {
        CoinHandler {
            default_denom: default_denom.into(),
        }
    }

    fn execute<K: KVStore>(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        let CoinTx::Send { from, to, amount } = CoinTx::try_from_slice(&tx.envelope.payload.body)
            .map_err(|err| HandlerError::rejected(format!("undecodable coin transaction: {}", err)))?;

        if amount.amount == 0 {
            return Err(HandlerError::rejected("cannot send zero coins"));
        }
        if !ctx.has_permission(&from) {
            return Err(HandlerError::rejected(format!(
                "{} has not authorized this transfer",
                from
            )));
        }

        Bank::transfer(view, &from, &to, &amount)?;
        Ok(TxResult::new(
            Vec::new(),
            format!("sent {} from {} to {}", amount, from, to),
        ))
    }

    // Split "<digits><denom>" into its parts.
    fn parse_amount(&self, value: &str) -> Result<Coin, HandlerError> {
        let split = value
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(value.len());
        let (digits, denom) = value.split_at(split);
        let amount = digits
            .parse::<u64>()
            .map_err(|err| HandlerError::rejected(format!("invalid amount {:?}: {}", value, err)))?;
        let denom = match denom.trim() {
            "" => self.default_denom.as_str(),
            denom => denom,
        };
        Ok(Coin::new(denom, amount))
    }
}

impl<K: KVStore> Handler<K> for CoinHandler {
    fn module(&self) -> ModuleTag {
        ModuleTag::from(COIN)
    }

    fn init_state(
        &self,
        _ctx: &ExecutionContext,
        view: &mut View<K>,
        key: &str,
        value: &str,
    ) -> Result<String, HandlerError> {
        let address = Address::from_base64url(key)
            .map_err(|err| HandlerError::rejected(format!("invalid address {:?}: {}", key, err)))?;
        let coin = self.parse_amount(value)?;
        let owner = Actor::new(SIGS, address);
        Bank::credit(view, &owner, &coin)?;
        Ok(format!("credited {} to {}", coin, owner))
    }

    fn check_tx(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        self.execute(ctx, view, tx)
    }

    fn deliver_tx(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        self.execute(ctx, view, tx)
    }
}

/// Balance bookkeeping over a [`View`].
///
/// Every method either applies all of its writes or none of them.
pub struct Bank;

impl Bank {
    pub fn balance<K: KVStore>(
        view: &View<K>,
        owner: &Actor,
        denom: &str,
    ) -> Result<u64, BankError> {
        Ok(super::read::<K, u64>(view, &balance_key(owner, denom))?.unwrap_or(0))
    }

    pub fn credit<K: KVStore>(
        view: &mut View<K>,
        owner: &Actor,
        coin: &Coin,
    ) -> Result<(), BankError> {
        let balance = Self::balance(view, owner, &coin.denom)?;
        let balance = balance
            .checked_add(coin.amount)
            .ok_or_else(|| BankError::Overflow { owner: owner.clone() })?;
        Ok(super::write(view, &balance_key(owner, &coin.denom), &balance)?)
    }

    pub fn debit<K: KVStore>(
        view: &mut View<K>,
        owner: &Actor,
        coin: &Coin,
    ) -> Result<(), BankError> {
        let balance = Self::balance(view, owner, &coin.denom)?;
        if balance < coin.amount {
            return Err(BankError::InsufficientFunds {
                owner: owner.clone(),
                needed: coin.clone(),
                available: balance,
            });
        }
        Ok(super::write(
            view,
            &balance_key(owner, &coin.denom),
            &(balance - coin.amount),
        )?)
    }

    pub fn transfer<K: KVStore>(
        view: &mut View<K>,
        from: &Actor,
        to: &Actor,
        coin: &Coin,
    ) -> Result<(), BankError> {
        if from == to {
            // Only the balance check matters.
            let balance = Self::balance(view, from, &coin.denom)?;
            if balance < coin.amount {
                return Err(BankError::InsufficientFunds {
                    owner: from.clone(),
                    needed: coin.clone(),
                    available: balance,
                });
            }
            return Ok(());
        }

        let checkpoint = view.checkpoint();
        Self::debit(view, from, coin)?;
        if let Err(err) = Self::credit(view, to, coin) {
            view.rollback(checkpoint);
            return Err(err);
        }
        Ok(())
    }
}

/// Key of the balance of `owner` in `denom`.
pub fn balance_key(owner: &Actor, denom: &str) -> Vec<u8> {
    let mut key = BALANCE_PREFIX.to_vec();
    key.extend_from_slice(denom.as_bytes());
    key.push(b'/');
    key.extend_from_slice(&owner.key_bytes());
    key
}

#[derive(Debug)]
pub enum BankError {
    InsufficientFunds {
        owner: Actor,
        needed: Coin,
        available: u64,
    },
    Overflow {
        owner: Actor,
    },
    KVGetError(KVGetError),
    KVSetError(KVSetError),
}

impl Display for BankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankError::InsufficientFunds {
                owner,
                needed,
                available,
            } => write!(
                f,
                "{} holds {}{} but needs {}",
                owner, available, needed.denom, needed
            ),
            BankError::Overflow { owner } => write!(f, "balance of {} would overflow", owner),
            BankError::KVGetError(err) => write!(f, "{}", err),
            BankError::KVSetError(err) => write!(f, "{}", err),
        }
    }
}

impl From<KVGetError> for BankError {
    fn from(value: KVGetError) -> Self {
        BankError::KVGetError(value)
    }
}

impl From<KVSetError> for BankError {
    fn from(value: KVSetError) -> Self {
        BankError::KVSetError(value)
    }
}

impl From<BankError> for HandlerError {
    fn from(value: BankError) -> Self {
        match value {
            BankError::KVGetError(err) => HandlerError::KVGetError(err),
            BankError::KVSetError(err) => HandlerError::KVSetError(err),
            other => HandlerError::Rejected(other.to_string()),
        }
    }
}
