/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Routing of transactions and genesis entries to module handlers.
//!
//! The set of handlers is fixed when the [`Dispatcher`] is built. Routing is a lookup of the
//! transaction's [module tag](crate::types::transaction::Payload::module) in that set; the Dispatcher
//! itself knows nothing about what any module does, and only shapes whatever its handler returns into a
//! [`TxError`].

use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use crate::{
    context::{CallKind, ExecutionContext},
    errors::{HandlerError, TxError},
    store::{KVStore, View},
    types::{data_types::ModuleTag, transaction::Transaction},
};

/// What a handler returns for a transaction it accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxResult {
    /// Module-defined result bytes.
    pub data: Vec<u8>,
    pub log: String,
}

impl TxResult {
    pub fn new(data: Vec<u8>, log: impl Into<String>) -> TxResult {
        TxResult {
            data,
            log: log.into(),
        }
    }
}

/// The business logic of one module.
///
/// Handlers read and write app state only through the [`View`] they are given. In check calls the view
/// is a private fork of the Check view; in deliver calls and genesis it is the Deliver view.
pub trait Handler<K: KVStore>: Send + Sync {
    /// The module tag this handler is registered under.
    fn module(&self) -> ModuleTag;

    /// Apply one genesis entry addressed to this module, returning a log line.
    fn init_state(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        key: &str,
        value: &str,
    ) -> Result<String, HandlerError>;

    /// Decide whether `tx` would be admissible.
    fn check_tx(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError>;

    /// Execute `tx`.
    fn deliver_tx(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError>;
}

pub struct Dispatcher<K: KVStore> {
    handlers: HashMap<ModuleTag, Box<dyn Handler<K>>>,
}

impl<K: KVStore> Dispatcher<K> {
    pub fn builder() -> DispatcherBuilder<K> {
        DispatcherBuilder {
            handlers: Vec::new(),
        }
    }

    /// Route `tx` to the handler registered for its module, calling `check_tx` or `deliver_tx`
    /// according to `ctx`'s [kind](ExecutionContext::kind).
    pub fn dispatch(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, TxError> {
        let module = tx.module();
        let handler = self
            .handlers
            .get(module)
            .ok_or_else(|| TxError::UnrecognizedModule(module.clone()))?;

        let result = match ctx.kind() {
            CallKind::Check => handler.check_tx(ctx, view, tx),
            CallKind::Deliver => handler.deliver_tx(ctx, view, tx),
        };
        result.map_err(|err| shape(module, err))
    }

    /// Route a genesis entry to the `init_state` of the handler registered for `module`.
    pub fn init_state(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        module: &ModuleTag,
        key: &str,
        value: &str,
    ) -> Result<String, TxError> {
        let handler = self
            .handlers
            .get(module)
            .ok_or_else(|| TxError::UnrecognizedModule(module.clone()))?;
        handler
            .init_state(ctx, view, key, value)
            .map_err(|err| shape(module, err))
    }
}

fn shape(module: &ModuleTag, err: HandlerError) -> TxError {
    match err {
        HandlerError::Rejected(reason) => TxError::HandlerRejected {
            module: module.clone(),
            reason,
        },
        HandlerError::KVGetError(err) => TxError::from(err),
        HandlerError::KVSetError(err) => TxError::from(err),
    }
}

pub struct DispatcherBuilder<K: KVStore> {
    handlers: Vec<Box<dyn Handler<K>>>,
}

impl<K: KVStore> DispatcherBuilder<K> {
    /// Register `handler` under its [module tag](Handler::module).
    pub fn handler(mut self, handler: impl Handler<K> + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn build(self) -> Result<Dispatcher<K>, DispatcherBuildError> {
        let mut handlers = HashMap::with_capacity(self.handlers.len());
        for handler in self.handlers {
            let module = handler.module();
            if handlers.contains_key(&module) {
                return Err(DispatcherBuildError::DuplicateModule(module));
            }
            handlers.insert(module, handler);
        }
        Ok(Dispatcher { handlers })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DispatcherBuildError {
    DuplicateModule(ModuleTag),
}

impl Display for DispatcherBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatcherBuildError::DuplicateModule(module) => {
                write!(f, "more than one handler registered for module {}", module)
            }
        }
    }
}
