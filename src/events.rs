/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Events emitted by a [node](crate::node::Node) after each call completes.
//!
//! Users can register handler closures for any of these events through the
//! [`NodeSpec`](crate::node::NodeSpec) builder. Handlers run synchronously on the thread that made the
//! call, after the call's effects are in place, so they must be quick. If
//! [`log_events`](crate::node::Configuration::log_events) is set, each event is also
//! [logged](crate::logging).

use std::time::SystemTime;

use crate::{
    errors::ErrorCode,
    types::data_types::{BlockHeight, CryptoHash, ModuleTag},
};

pub enum Event {
    InitChain(InitChainEvent),
    CheckTx(CheckTxEvent),
    DeliverTx(DeliverTxEvent),
    Commit(CommitEvent),
    Query(QueryEvent),
}

/// Genesis was applied and committed.
pub struct InitChainEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub entries_applied: usize,
}

/// A check call completed, successfully or not.
pub struct CheckTxEvent {
    pub timestamp: SystemTime,

    /// `None` if the transaction could not be decoded.
    pub tx: Option<CryptoHash>,
    pub module: Option<ModuleTag>,
    pub code: ErrorCode,
}

/// A deliver call completed, successfully or not.
pub struct DeliverTxEvent {
    pub timestamp: SystemTime,
    pub tx: Option<CryptoHash>,
    pub module: Option<ModuleTag>,

    /// The height the transaction will be committed at.
    pub height: BlockHeight,
    pub code: ErrorCode,
}

/// A snapshot was committed.
pub struct CommitEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub root: CryptoHash,
}

pub struct QueryEvent {
    pub timestamp: SystemTime,
    pub path: String,
    pub height: u64,
    pub code: ErrorCode,
}
