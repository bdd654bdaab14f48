/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The transaction-processing core of an application node.
//!
//! A consensus engine drives the core through a [`Node`](node::Node): it submits transactions for
//! checking and for delivery, and signals a commit once per block. The core:
//! 1. Keeps the app state as a sequence of committed, Merkle-authenticated [snapshots](store) plus
//!    two live views: the Check view for admissibility checks, and the Deliver view for execution.
//! 2. Runs every transaction through a [middleware chain](chain) (signature verification, chain and
//!    expiry guards, replay protection, roles, fees) before [dispatching](dispatcher) it to the
//!    [module](modules) it is addressed to.
//! 3. Applies [genesis](genesis) all-or-nothing.
//! 4. Answers [queries](query) against any retained height, optionally with a Merkle proof.
//!
//! The durable medium is pluggable: implement [`KVStore`](store::KVStore) for it, or use the in-memory
//! [`MemDB`](store::MemDB).

pub mod chain;

pub mod context;

pub mod dispatcher;

pub mod errors;

pub mod event_bus;

pub mod events;

pub mod genesis;

pub mod logging;

pub mod modules;

pub mod node;

pub mod query;

pub mod store;

pub mod types;
