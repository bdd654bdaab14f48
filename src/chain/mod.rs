/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The middleware chain every transaction passes through before reaching its handler.
//!
//! A [`MiddlewareChain`] is an ordered list of [stages](Stage) ending in the [`Dispatcher`]. Each stage
//! receives the call's [context](ExecutionContext), the [view](View) the call reads and writes, the
//! transaction, and a [`Next`] continuation to the rest of the chain. A stage can:
//! 1. Reject the transaction by returning an error without calling `next`. No later stage runs and the
//!    dispatcher is never reached.
//! 2. Call `next` with the context it received, or with a
//!    [derived](ExecutionContext::with_permissions) one.
//! 3. Post-process whatever `next` returns, e.g., roll back the view if it is an error.
//!
//! Check calls and deliver calls run exactly the same chain. The only differences are the
//! [`CallKind`](crate::context::CallKind) in the context and which view is passed in.
//!
//! ## Ordering
//!
//! Some stages depend on what earlier stages grant. [`ChainBuilder::build`] refuses orderings in which
//! that cannot work:
//! - [`Recovery`](Stage::Recovery) must be present and must be the first stage, so that a panic anywhere
//!   in the chain is recovered.
//! - [`Signatures`](Stage::Signatures) must run before [`ReplayCheck`](Stage::ReplayCheck),
//!   [`Roles`](Stage::Roles), and [`Fee`](Stage::Fee).
//! - [`ReplayCheck`](Stage::ReplayCheck) must run before [`Fee`](Stage::Fee), so that a replayed
//!   transaction is never charged.
//!
//! [`MiddlewareChain::standard`] returns the chain nodes normally run.

use std::fmt::{self, Display};

use crate::{
    context::ExecutionContext,
    dispatcher::{Dispatcher, TxResult},
    errors::TxError,
    store::{KVStore, View},
    types::transaction::Transaction,
};

pub mod chain_guard;

pub mod checkpoint;

pub mod fee;

pub mod logger;

pub mod recovery;

pub mod replay;

pub mod roles;

pub mod signatures;

pub use fee::FeeConfig;

/// One link of a [`MiddlewareChain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Logs the start, outcome, and duration of every call.
    Logger,

    /// Converts a panic anywhere downstream into [`TxError::InternalFault`] and undoes the call's writes.
    Recovery,

    /// Verifies every signature on the transaction and grants a signer actor for each.
    Signatures,

    /// Rejects transactions signed for another chain, or that have expired.
    ChainGuard,

    /// Saves the view before calling downstream, and rolls back to it if downstream fails. Enabled
    /// separately for check and deliver calls.
    Checkpoint { on_check: bool, on_deliver: bool },

    /// Enforces strictly increasing sequence numbers per set of signers.
    ReplayCheck,

    /// Grants the actor of every role the transaction assumes, if the role's threshold is met.
    Roles,

    /// Charges the transaction's fee.
    Fee(FeeConfig),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Logger => logger::NAME,
            Stage::Recovery => recovery::NAME,
            Stage::Signatures => signatures::NAME,
            Stage::ChainGuard => chain_guard::NAME,
            Stage::Checkpoint { .. } => checkpoint::NAME,
            Stage::ReplayCheck => replay::NAME,
            Stage::Roles => roles::NAME,
            Stage::Fee(_) => fee::NAME,
        }
    }

    fn run<K: KVStore>(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
        next: Next<'_, K>,
    ) -> Result<TxResult, TxError> {
        match self {
            Stage::Logger => logger::run(ctx, view, tx, next),
            Stage::Recovery => recovery::run(ctx, view, tx, next),
            Stage::Signatures => signatures::run(ctx, view, tx, next),
            Stage::ChainGuard => chain_guard::run(ctx, view, tx, next),
            Stage::Checkpoint {
                on_check,
                on_deliver,
            } => checkpoint::run(*on_check, *on_deliver, ctx, view, tx, next),
            Stage::ReplayCheck => replay::run(ctx, view, tx, next),
            Stage::Roles => roles::run(ctx, view, tx, next),
            Stage::Fee(config) => fee::run(config, ctx, view, tx, next),
        }
    }
}

/// Continuation to the rest of a chain: the stages after the current one, then the dispatcher.
pub struct Next<'a, K: KVStore> {
    stages: &'a [Stage],
    dispatcher: &'a Dispatcher<K>,
}

impl<'a, K: KVStore> Next<'a, K> {
    pub fn run(
        self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, TxError> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.run(
                ctx,
                view,
                tx,
                Next {
                    stages: rest,
                    dispatcher: self.dispatcher,
                },
            ),
            None => self.dispatcher.dispatch(ctx, view, tx),
        }
    }
}

/// An immutable, validated sequence of stages.
#[derive(Clone, Debug)]
pub struct MiddlewareChain {
    stages: Vec<Stage>,
}

impl MiddlewareChain {
    pub fn builder() -> ChainBuilder {
        ChainBuilder { stages: Vec::new() }
    }

    /// The chain nodes normally run:
    ///
    /// ```text
    /// Recovery → Logger → Signatures → ChainGuard → Checkpoint(check) → ReplayCheck → Roles → Fee
    ///          → Checkpoint(deliver) → Dispatcher
    /// ```
    pub fn standard(fee: FeeConfig) -> MiddlewareChain {
        MiddlewareChain {
            stages: vec![
                Stage::Recovery,
                Stage::Logger,
                Stage::Signatures,
                Stage::ChainGuard,
                Stage::Checkpoint {
                    on_check: true,
                    on_deliver: false,
                },
                Stage::ReplayCheck,
                Stage::Roles,
                Stage::Fee(fee),
                Stage::Checkpoint {
                    on_check: false,
                    on_deliver: true,
                },
            ],
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run `tx` through every stage and then the dispatcher.
    ///
    /// If the result is an error, every write this call made to `view` has been undone.
    pub fn process<K: KVStore>(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
        dispatcher: &Dispatcher<K>,
    ) -> Result<TxResult, TxError> {
        let checkpoint = view.checkpoint();
        let result = Next {
            stages: &self.stages,
            dispatcher,
        }
        .run(ctx, view, tx);
        if result.is_err() {
            view.rollback(checkpoint);
        }
        result
    }
}

pub struct ChainBuilder {
    stages: Vec<Stage>,
}

impl ChainBuilder {
    /// Append `stage` to the chain.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Result<MiddlewareChain, ChainBuildError> {
        let position = |name: &str| self.stages.iter().position(|stage| stage.name() == name);

        for (i, stage) in self.stages.iter().enumerate() {
            let repeatable = matches!(stage, Stage::Checkpoint { .. });
            if !repeatable && position(stage.name()) != Some(i) {
                return Err(ChainBuildError::Duplicate(stage.name()));
            }
        }

        let recovery = position(recovery::NAME).ok_or(ChainBuildError::MissingRecovery)?;
        if recovery != 0 {
            return Err(ChainBuildError::OutOfOrder {
                stage: self.stages[0].name(),
                must_follow: recovery::NAME,
            });
        }

        let must_follow = [
            (replay::NAME, signatures::NAME),
            (roles::NAME, signatures::NAME),
            (fee::NAME, signatures::NAME),
            (fee::NAME, replay::NAME),
        ];
        for (stage, dependency) in must_follow {
            if let Some(stage_position) = position(stage) {
                let satisfied = match position(dependency) {
                    Some(dependency_position) => dependency_position < stage_position,
                    // Fee without ReplayCheck is allowed; anything needing signers is not.
                    None => dependency == replay::NAME,
                };
                if !satisfied {
                    return Err(ChainBuildError::OutOfOrder {
                        stage,
                        must_follow: dependency,
                    });
                }
            }
        }

        Ok(MiddlewareChain {
            stages: self.stages,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ChainBuildError {
    MissingRecovery,
    Duplicate(&'static str),
    OutOfOrder {
        stage: &'static str,
        must_follow: &'static str,
    },
}

impl Display for ChainBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainBuildError::MissingRecovery => write!(f, "chain has no recovery stage"),
            ChainBuildError::Duplicate(stage) => write!(f, "stage {} appears more than once", stage),
            ChainBuildError::OutOfOrder { stage, must_follow } => {
                write!(f, "stage {} must come after stage {}", stage, must_follow)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::data_types::{Actor, Address, Coin};

    fn fee() -> FeeConfig {
        FeeConfig::new(
            Coin::new("atom", 0),
            Actor::new("sigs", Address::new(vec![9; 20])),
        )
    }

    #[test]
    fn standard_chain_passes_validation() {
        let standard = MiddlewareChain::standard(fee());
        let rebuilt = standard
            .stages()
            .iter()
            .cloned()
            .fold(MiddlewareChain::builder(), |builder, stage| builder.stage(stage))
            .build()
            .unwrap();
        assert_eq!(rebuilt.stages(), standard.stages());
    }

    #[test]
    fn misordered_chains_are_refused() {
        let no_recovery = MiddlewareChain::builder().stage(Stage::Signatures).build();
        assert_eq!(no_recovery.unwrap_err(), ChainBuildError::MissingRecovery);

        let signatures_first = MiddlewareChain::builder()
            .stage(Stage::Signatures)
            .stage(Stage::Recovery)
            .build();
        assert!(matches!(
            signatures_first.unwrap_err(),
            ChainBuildError::OutOfOrder { stage: "signatures", .. }
        ));

        let fee_before_replay = MiddlewareChain::builder()
            .stage(Stage::Recovery)
            .stage(Stage::Signatures)
            .stage(Stage::Fee(fee()))
            .stage(Stage::ReplayCheck)
            .build();
        assert_eq!(
            fee_before_replay.unwrap_err(),
            ChainBuildError::OutOfOrder {
                stage: "fee",
                must_follow: "replay_check"
            }
        );

        let roles_without_signatures = MiddlewareChain::builder()
            .stage(Stage::Recovery)
            .stage(Stage::Roles)
            .build();
        assert!(roles_without_signatures.is_err());

        let logger_first = MiddlewareChain::builder()
            .stage(Stage::Logger)
            .stage(Stage::Recovery)
            .build();
        assert_eq!(
            logger_first.unwrap_err(),
            ChainBuildError::OutOfOrder {
                stage: "logger",
                must_follow: "recovery"
            }
        );

        let twice = MiddlewareChain::builder()
            .stage(Stage::Recovery)
            .stage(Stage::Recovery)
            .build();
        assert_eq!(twice.unwrap_err(), ChainBuildError::Duplicate("recovery"));
    }
}
