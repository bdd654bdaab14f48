/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Error types returned by transaction calls, handlers, and genesis.
//!
//! Every failure of a check or deliver call is a [`TxError`], and every `TxError` maps to a stable
//! [`ErrorCode`] that is reported to the caller in the response envelope. All of them are recovered at
//! the call boundary, except [`TxError::PersistenceFailure`], which halts the [node](crate::node::Node).

use std::fmt::{self, Display};

use crate::{
    store::{pluggables::KVSetError, KVGetError, StoreError},
    types::data_types::{BlockHeight, ModuleTag},
};

/// Stable, numeric failure categories reported in responses. `0` always means success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    Ok = 0,
    MalformedInput = 1,
    UnrecognizedModule = 2,
    RejectedByStage = 3,
    HandlerRejected = 4,
    HeightUnavailable = 5,
    InternalFault = 6,
    PersistenceFailure = 7,
    NotInitialized = 8,
}

impl ErrorCode {
    pub const fn code(&self) -> u32 {
        *self as u32
    }

    pub const fn from_code(code: u32) -> Option<ErrorCode> {
        match code {
            0 => Some(ErrorCode::Ok),
            1 => Some(ErrorCode::MalformedInput),
            2 => Some(ErrorCode::UnrecognizedModule),
            3 => Some(ErrorCode::RejectedByStage),
            4 => Some(ErrorCode::HandlerRejected),
            5 => Some(ErrorCode::HeightUnavailable),
            6 => Some(ErrorCode::InternalFault),
            7 => Some(ErrorCode::PersistenceFailure),
            8 => Some(ErrorCode::NotInitialized),
            _ => None,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug)]
pub enum TxError {
    /// The wire bytes of a transaction or query could not be decoded, or named an unsupported path.
    MalformedInput(String),

    /// No handler is registered for the module a transaction or genesis entry is addressed to.
    UnrecognizedModule(ModuleTag),

    /// A middleware stage refused the transaction before it reached its handler.
    RejectedByStage { stage: &'static str, reason: String },

    /// The handler ran and rejected the transaction.
    HandlerRejected { module: ModuleTag, reason: String },

    HeightUnavailable {
        requested: BlockHeight,
        earliest: BlockHeight,
        latest: BlockHeight,
    },

    /// Something that should never happen did: a panic downstream of the recovery stage, or an
    /// unreadable value in the store.
    InternalFault(String),

    /// A commit could not be made durable. The node stops serving calls after this.
    PersistenceFailure(String),

    /// A deliver call or commit arrived before genesis was committed.
    NotInitialized,
}

impl TxError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TxError::MalformedInput(_) => ErrorCode::MalformedInput,
            TxError::UnrecognizedModule(_) => ErrorCode::UnrecognizedModule,
            TxError::RejectedByStage { .. } => ErrorCode::RejectedByStage,
            TxError::HandlerRejected { .. } => ErrorCode::HandlerRejected,
            TxError::HeightUnavailable { .. } => ErrorCode::HeightUnavailable,
            TxError::InternalFault(_) => ErrorCode::InternalFault,
            TxError::PersistenceFailure(_) => ErrorCode::PersistenceFailure,
            TxError::NotInitialized => ErrorCode::NotInitialized,
        }
    }

    pub(crate) fn rejected(stage: &'static str, reason: impl Into<String>) -> TxError {
        TxError::RejectedByStage {
            stage,
            reason: reason.into(),
        }
    }
}

impl Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::MalformedInput(reason) => write!(f, "malformed input: {}", reason),
            TxError::UnrecognizedModule(module) => write!(f, "unrecognized module: {}", module),
            TxError::RejectedByStage { stage, reason } => {
                write!(f, "rejected by {}: {}", stage, reason)
            }
            TxError::HandlerRejected { module, reason } => {
                write!(f, "rejected by {} handler: {}", module, reason)
            }
            TxError::HeightUnavailable {
                requested,
                earliest,
                latest,
            } => write!(
                f,
                "height {} unavailable (retained heights are {} to {})",
                requested, earliest, latest
            ),
            TxError::InternalFault(reason) => write!(f, "internal fault: {}", reason),
            TxError::PersistenceFailure(reason) => write!(f, "persistence failure: {}", reason),
            TxError::NotInitialized => write!(f, "genesis has not been committed"),
        }
    }
}

impl From<KVGetError> for TxError {
    fn from(value: KVGetError) -> Self {
        TxError::InternalFault(value.to_string())
    }
}

impl From<KVSetError> for TxError {
    fn from(value: KVSetError) -> Self {
        TxError::InternalFault(value.to_string())
    }
}

impl From<StoreError> for TxError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::HeightUnavailable {
                requested,
                earliest,
                latest,
            } => TxError::HeightUnavailable {
                requested,
                earliest,
                latest,
            },
            StoreError::KVGetError(err) => TxError::from(err),
            StoreError::Poisoned => TxError::InternalFault(value.to_string()),
            StoreError::Halted => TxError::PersistenceFailure(value.to_string()),
        }
    }
}

/// Error returned by a [`Handler`](crate::dispatcher::Handler).
#[derive(Debug)]
pub enum HandlerError {
    /// The transaction or genesis entry is invalid by the module's rules.
    Rejected(String),

    /// Reading the module's state failed.
    KVGetError(KVGetError),

    /// Encoding a value of the module's state failed.
    KVSetError(KVSetError),
}

impl HandlerError {
    pub fn rejected(reason: impl Into<String>) -> HandlerError {
        HandlerError::Rejected(reason.into())
    }
}

impl Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Rejected(reason) => write!(f, "{}", reason),
            HandlerError::KVGetError(err) => write!(f, "{}", err),
            HandlerError::KVSetError(err) => write!(f, "{}", err),
        }
    }
}

impl From<KVGetError> for HandlerError {
    fn from(value: KVGetError) -> Self {
        HandlerError::KVGetError(value)
    }
}

impl From<KVSetError> for HandlerError {
    fn from(value: KVSetError) -> Self {
        HandlerError::KVSetError(value)
    }
}

/// Error returned by [`GenesisInitializer::apply`](crate::genesis::GenesisInitializer::apply). None of
/// the entries have been applied when this is returned.
#[derive(Debug)]
pub struct GenesisError {
    /// Position of the failed entry in the list passed to `apply`.
    pub index: usize,
    pub module: ModuleTag,
    pub key: String,
    pub source: TxError,
}

impl Display for GenesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "genesis entry {} ({}/{}) failed: {}",
            self.index, self.module, self.key, self.source
        )
    }
}
