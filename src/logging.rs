/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the node's
//! [configuration](crate::node::Configuration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [DeliverTx](crate::events::DeliverTxEvent) is printed:
//!
//! ```text
//! DeliverTx, 1701329264, fNGCJyk, coin, 4, 0
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the transaction's hash.
//! - The fourth value is the module the transaction is addressed to.
//! - The fifth value is the height the transaction will be committed at.
//! - The sixth value is the [response code](crate::errors::ErrorCode).
//!
//! Values that are unknown (e.g., the hash of a transaction that could not be decoded) are printed as
//! `-`.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::{event_bus::HandlerPtr, events::*};

// Names of each event in PascalCase for printing:
pub const INIT_CHAIN: &str = "InitChain";
pub const CHECK_TX: &str = "CheckTx";
pub const DELIVER_TX: &str = "DeliverTx";
pub const COMMIT: &str = "Commit";
pub const QUERY: &str = "Query";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> HandlerPtr<Self>;
}

impl Logger for InitChainEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |init_chain_event: &InitChainEvent| {
            log::info!(
                "{}, {}, {}, {}",
                INIT_CHAIN,
                secs_since_unix_epoch(init_chain_event.timestamp),
                init_chain_event.height,
                init_chain_event.entries_applied
            )
        };
        Box::new(logger)
    }
}

impl Logger for CheckTxEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |check_tx_event: &CheckTxEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                CHECK_TX,
                secs_since_unix_epoch(check_tx_event.timestamp),
                check_tx_event
                    .tx
                    .map_or(String::from("-"), |tx| first_seven_base64_chars(&tx.bytes())),
                check_tx_event
                    .module
                    .as_ref()
                    .map_or("-", |module| module.as_str()),
                check_tx_event.code
            )
        };
        Box::new(logger)
    }
}

impl Logger for DeliverTxEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |deliver_tx_event: &DeliverTxEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                DELIVER_TX,
                secs_since_unix_epoch(deliver_tx_event.timestamp),
                deliver_tx_event
                    .tx
                    .map_or(String::from("-"), |tx| first_seven_base64_chars(&tx.bytes())),
                deliver_tx_event
                    .module
                    .as_ref()
                    .map_or("-", |module| module.as_str()),
                deliver_tx_event.height,
                deliver_tx_event.code
            )
        };
        Box::new(logger)
    }
}

impl Logger for CommitEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |commit_event: &CommitEvent| {
            log::info!(
                "{}, {}, {}, {}",
                COMMIT,
                secs_since_unix_epoch(commit_event.timestamp),
                commit_event.height,
                first_seven_base64_chars(&commit_event.root.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for QueryEvent {
    fn get_logger() -> HandlerPtr<Self> {
        let logger = |query_event: &QueryEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                QUERY,
                secs_since_unix_epoch(query_event.timestamp),
                query_event.path,
                query_event.height,
                query_event.code
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Events are timestamped by this process, so a clock set before the epoch is the only way to get 0.
fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
