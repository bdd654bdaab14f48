/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! One-time initialization of the app state from a list of genesis entries.
//!
//! Genesis is all-or-nothing: [`GenesisInitializer::apply`] writes every entry into the Deliver view,
//! and if any entry fails or its handler panics, undoes every write it made before returning the error.
//! On success the caller
//! commits once, producing the state at height 1 (see [`Node::init_chain`](crate::node::Node::init_chain)).
//!
//! Entries addressed to the module `"base"` are skipped. They configure the node itself, which is
//! outside the app state.

use std::panic::{self, AssertUnwindSafe};

use crate::{
    chain::recovery::panic_message,
    context::ExecutionContext,
    dispatcher::Dispatcher,
    errors::{GenesisError, TxError},
    store::{KVStore, View},
    types::data_types::ModuleTag,
};

/// Entries for this module are never dispatched.
pub const BASE_MODULE: &str = "base";

/// A `(module, key, value)` triple from the genesis file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisEntry {
    pub module: ModuleTag,
    pub key: String,
    pub value: String,
}

impl GenesisEntry {
    pub fn new(
        module: impl Into<ModuleTag>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> GenesisEntry {
        GenesisEntry {
            module: module.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

pub struct GenesisInitializer;

impl GenesisInitializer {
    /// Apply `entries` in order, returning how many were dispatched.
    pub fn apply<K: KVStore>(
        ctx: &ExecutionContext,
        entries: &[GenesisEntry],
        view: &mut View<K>,
        dispatcher: &Dispatcher<K>,
    ) -> Result<usize, GenesisError> {
        let checkpoint = view.checkpoint();
        let mut applied = 0;

        for (index, entry) in entries.iter().enumerate() {
            if entry.module.as_str() == BASE_MODULE {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                dispatcher.init_state(ctx, view, &entry.module, &entry.key, &entry.value)
            }))
            .unwrap_or_else(|payload| {
                let reason = panic_message(payload.as_ref());
                ctx.logger()
                    .warn(format_args!("genesis {} panicked: {}", index, reason));
                Err(TxError::InternalFault(reason))
            });

            match outcome {
                Ok(log) => {
                    ctx.logger().debug(format_args!("genesis {}: {}", index, log));
                    applied += 1;
                }
                Err(source) => {
                    view.rollback(checkpoint);
                    return Err(GenesisError {
                        index,
                        module: entry.module.clone(),
                        key: entry.key.clone(),
                        source,
                    });
                }
            }
        }

        Ok(applied)
    }
}
