//! Types and traits that are used across multiple components of the transaction pipeline.
//!
//! Types specific to a single component, e.g., the [`View`](crate::store::View) of the versioned store,
//! live next to that component.

pub mod crypto_primitives;

pub mod data_types;

pub mod transaction;

pub mod update_sets;
