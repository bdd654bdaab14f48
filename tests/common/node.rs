//! Builders for the nodes the integration tests drive, and helpers for talking to them.

use borsh::{BorshDeserialize, BorshSerialize};
use txstack::{
    chain::{signatures::SIGS, FeeConfig, MiddlewareChain, Stage},
    dispatcher::Dispatcher,
    modules::{
        coin::{balance_key, CoinHandler, CoinTx, COIN},
        roles::RolesHandler,
    },
    node::{Configuration, Node, NodeSpec},
    query::{QueryRequest, QueryResponse},
    store::{KVStore, MemDB},
    types::{
        data_types::{Actor, Address, ChainID, Coin},
        transaction::{Envelope, Payload, Transaction},
    },
};

use super::{
    keys::Account,
    script_app::{ScriptControls, ScriptHandler},
};

pub(crate) const CHAIN_ID: ChainID = ChainID::new(7);
pub(crate) const DENOM: &str = "atom";

/// The account fees are paid into.
pub(crate) fn collector() -> Actor {
    Actor::new(SIGS, Address::new(vec![0xfe; 20]))
}

pub(crate) fn configuration(retain_heights: Option<u64>) -> Configuration {
    Configuration::builder()
        .chain_id(CHAIN_ID)
        .retain_heights(retain_heights)
        .log_events(true)
        .build()
}

/// A node running the standard chain over the coin and roles modules.
pub(crate) fn bank_node<K: KVStore>(kv_store: K, min_fee: u64) -> Node<K> {
    let dispatcher = Dispatcher::builder()
        .handler(CoinHandler::new(DENOM))
        .handler(RolesHandler::new())
        .build()
        .unwrap();

    NodeSpec::builder()
        .kv_store(kv_store)
        .configuration(configuration(None))
        .chain(MiddlewareChain::standard(FeeConfig::new(
            Coin::new(DENOM, min_fee),
            collector(),
        )))
        .dispatcher(dispatcher)
        .build()
        .open()
        .unwrap()
}

/// A node whose chain only recovers and logs, over the script and coin modules. Genesis is not
/// committed yet.
pub(crate) fn script_node(controls: ScriptControls, retain_heights: Option<u64>) -> Node<MemDB> {
    let chain = MiddlewareChain::builder()
        .stage(Stage::Recovery)
        .stage(Stage::Logger)
        .build()
        .unwrap();
    let dispatcher = Dispatcher::builder()
        .handler(ScriptHandler::new(controls))
        .handler(CoinHandler::new(DENOM))
        .build()
        .unwrap();

    NodeSpec::builder()
        .kv_store(MemDB::new())
        .configuration(configuration(retain_heights))
        .chain(chain)
        .dispatcher(dispatcher)
        .build()
        .open()
        .unwrap()
}

/// Encode a signed transfer of `amount` from `from` to `to`, with `fee` attached if it is non-zero.
pub(crate) fn send(from: &Account, to: &Actor, amount: u64, sequence: u64, fee: u64) -> Vec<u8> {
    let body = CoinTx::Send {
        from: from.actor.clone(),
        to: to.clone(),
        amount: Coin::new(DENOM, amount),
    }
    .try_to_vec()
    .unwrap();

    let mut envelope = Envelope::new(CHAIN_ID, Payload::new(COIN, body))
        .with_nonce(sequence, vec![from.actor.clone()]);
    if fee > 0 {
        envelope = envelope.with_fee(from.actor.clone(), Coin::new(DENOM, fee));
    }

    Transaction::new(envelope)
        .sign(&from.signing_key)
        .unwrap()
        .encode()
        .unwrap()
}

pub(crate) fn query<K: KVStore>(
    node: &Node<K>,
    key: &[u8],
    height: u64,
    prove: bool,
) -> QueryResponse {
    node.query(&QueryRequest::key(key, height, prove).encode().unwrap())
}

/// Balance of `owner` at `height` (0 for latest), or `None` if the owner has never held any coins.
pub(crate) fn balance<K: KVStore>(node: &Node<K>, owner: &Actor, height: u64) -> Option<u64> {
    let response = query(node, &balance_key(owner, DENOM), height, false);
    assert!(response.is_ok(), "balance query failed: {}", response.log);
    if response.index < 0 {
        None
    } else {
        Some(u64::try_from_slice(&response.value).unwrap())
    }
}
