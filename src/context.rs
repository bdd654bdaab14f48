/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-call execution context.
//!
//! An [`ExecutionContext`] is created fresh for every check call, deliver call, and genesis run, and is
//! dropped when the call returns. Stages that learn something about the caller (e.g., which keys signed
//! the transaction) pass a [derived](ExecutionContext::with_permissions) context downstream rather than
//! mutating the one they were given, so nothing a stage learns can leak upstream or into another call.

use std::fmt::{self, Display};

use crate::types::data_types::{Actor, BlockHeight, ChainID, CryptoHash};

/// Whether a call only decides admissibility (check) or executes for real (deliver).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    Check,
    Deliver,
}

impl CallKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CallKind::Check => "checktx",
            CallKind::Deliver => "delivertx",
        }
    }
}

impl Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger scoped to one call. Every line it writes is prefixed with the call's name and, once known,
/// the hash of the transaction being processed.
#[derive(Clone, Debug)]
pub struct CallLogger {
    call: &'static str,
    tx: Option<CryptoHash>,
}

impl CallLogger {
    pub fn new(call: &'static str) -> CallLogger {
        CallLogger { call, tx: None }
    }

    /// A logger that additionally tags every line with `tx`.
    pub fn for_tx(&self, tx: CryptoHash) -> CallLogger {
        CallLogger {
            call: self.call,
            tx: Some(tx),
        }
    }

    pub fn log(&self, level: log::Level, args: fmt::Arguments<'_>) {
        match &self.tx {
            Some(tx) => log::log!(level, "call={}, tx={}, {}", self.call, tx, args),
            None => log::log!(level, "call={}, {}", self.call, args),
        }
    }

    pub fn info(&self, message: impl Display) {
        self.log(log::Level::Info, format_args!("{}", message))
    }

    pub fn debug(&self, message: impl Display) {
        self.log(log::Level::Debug, format_args!("{}", message))
    }

    pub fn warn(&self, message: impl Display) {
        self.log(log::Level::Warn, format_args!("{}", message))
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionContext {
    chain_id: ChainID,
    height: BlockHeight,
    kind: CallKind,
    logger: CallLogger,

    // Actors that have authorized this call, in the order they were granted.
    permissions: Vec<Actor>,
}

impl ExecutionContext {
    /// Create a context for a call at working height `height` with no permissions granted.
    pub fn new(chain_id: ChainID, height: BlockHeight, kind: CallKind, logger: CallLogger) -> Self {
        ExecutionContext {
            chain_id,
            height,
            kind,
            logger,
            permissions: Vec::new(),
        }
    }

    pub fn chain_id(&self) -> ChainID {
        self.chain_id
    }

    /// The height the current call would be committed at.
    pub fn height(&self) -> BlockHeight {
        self.height
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn logger(&self) -> &CallLogger {
        &self.logger
    }

    pub fn permissions(&self) -> &[Actor] {
        &self.permissions
    }

    pub fn has_permission(&self, actor: &Actor) -> bool {
        self.permissions.contains(actor)
    }

    /// A copy of this context with `granted` added to its permissions. Duplicates are ignored.
    pub fn with_permissions(&self, granted: impl IntoIterator<Item = Actor>) -> ExecutionContext {
        let mut derived = self.clone();
        for actor in granted {
            if !derived.permissions.contains(&actor) {
                derived.permissions.push(actor);
            }
        }
        derived
    }

    /// A copy of this context whose logger tags lines with `tx`.
    pub fn with_tx_hash(&self, tx: CryptoHash) -> ExecutionContext {
        let mut derived = self.clone();
        derived.logger = self.logger.for_tx(tx);
        derived
    }
}
