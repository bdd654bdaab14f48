use std::sync::{Arc, Mutex};

use log::LevelFilter;
use txstack::{
    chain::{FeeConfig, MiddlewareChain},
    dispatcher::Dispatcher,
    errors::ErrorCode,
    genesis::GenesisEntry,
    modules::coin::{balance_key, CoinHandler, COIN},
    node::NodeSpec,
    store::MemDB,
    types::data_types::{BlockHeight, Coin},
};

mod common;

use crate::common::{
    keys::Account,
    logging::setup_logger,
    node::{bank_node, balance, collector, configuration, query, send, DENOM},
};

#[test]
fn transfer_between_two_accounts_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Initialize test components.

    // 1.1. Create keys for Alice and Bob.
    let alice = Account::generate();
    let bob = Account::generate();

    // 1.2. Open a node that charges a minimum fee of 1 atom.
    let node = bank_node(MemDB::new(), 1);

    // 2. Apply genesis, crediting Alice with 1000 atom.
    let height = node
        .init_chain(&[GenesisEntry::new(COIN, alice.genesis_address(), "1000")])
        .unwrap();
    assert_eq!(height, BlockHeight::new(1));
    assert_eq!(balance(&node, &alice.actor, 1), Some(1000));
    assert_eq!(balance(&node, &bob.actor, 1), None);

    // 3. Alice sends 100 atom to Bob, paying a fee of 2 atom.
    let response = node.deliver_tx(&send(&alice, &bob.actor, 100, 1, 2));
    assert!(response.is_ok(), "{}", response.log);

    // 3.1. Nothing is visible to queries until the block is committed.
    assert_eq!(balance(&node, &bob.actor, 0), None);

    // 4. Commit height 2.
    let height = node.commit().unwrap();
    assert_eq!(height, BlockHeight::new(2));

    // 5. Height 2 reflects the transfer and the fee, height 1 still reflects genesis.
    assert_eq!(balance(&node, &alice.actor, 2), Some(898));
    assert_eq!(balance(&node, &bob.actor, 2), Some(100));
    assert_eq!(balance(&node, &collector(), 2), Some(2));
    assert_eq!(balance(&node, &alice.actor, 1), Some(1000));
    assert_eq!(balance(&node, &bob.actor, 1), None);

    // 6. Height 0 reads the latest height.
    assert_eq!(balance(&node, &alice.actor, 0), Some(898));

    // 7. Proofs of Alice's balance verify against the root recorded at both heights.
    for height in 1..=2 {
        let key = balance_key(&alice.actor, DENOM);
        let response = query(&node, &key, height, true);
        assert!(response.is_ok(), "{}", response.log);
        let proof = response.merkle_proof().unwrap().unwrap();
        let root = node.root_at(BlockHeight::new(height)).unwrap();
        assert!(proof.verify(&root, &key, &response.value));
    }
}

#[test]
fn alice_sends_thirty_to_bob_test() {
    setup_logger(LevelFilter::Trace);

    let alice = Account::generate();
    let bob = Account::generate();
    let node = bank_node(MemDB::new(), 0);

    // Alice starts with 100, Bob with nothing.
    node.init_chain(&[GenesisEntry::new(COIN, alice.genesis_address(), "100")])
        .unwrap();

    let response = node.deliver_tx(&send(&alice, &bob.actor, 30, 1, 0));
    assert!(response.is_ok(), "{}", response.log);
    assert_eq!(node.commit().unwrap(), BlockHeight::new(2));

    assert_eq!(balance(&node, &alice.actor, 2), Some(70));
    assert_eq!(balance(&node, &bob.actor, 2), Some(30));
    assert_eq!(balance(&node, &alice.actor, 1), Some(100));
    assert_eq!(balance(&node, &bob.actor, 1), None);
}

#[test]
fn overdraft_leaves_balances_and_sequence_untouched_test() {
    setup_logger(LevelFilter::Trace);

    let alice = Account::generate();
    let bob = Account::generate();
    let node = bank_node(MemDB::new(), 1);
    node.init_chain(&[GenesisEntry::new(COIN, alice.genesis_address(), "50")])
        .unwrap();

    // 1. Sending more than Alice holds is rejected by the coin handler. The fee, charged before the
    //    handler ran, is rolled back together with everything else.
    let response = node.deliver_tx(&send(&alice, &bob.actor, 500, 1, 1));
    assert_eq!(response.error_code(), ErrorCode::HandlerRejected, "{}", response.log);

    // 2. The rejected transaction did not use up sequence 1.
    let response = node.deliver_tx(&send(&alice, &bob.actor, 10, 1, 1));
    assert!(response.is_ok(), "{}", response.log);

    node.commit().unwrap();
    assert_eq!(balance(&node, &alice.actor, 0), Some(39));
    assert_eq!(balance(&node, &bob.actor, 0), Some(10));
    assert_eq!(balance(&node, &collector(), 0), Some(1));
}

#[test]
fn events_fire_for_every_call_test() {
    setup_logger(LevelFilter::Trace);

    let alice = Account::generate();
    let bob = Account::generate();

    // 1. Open a node that records every commit and deliver event it fires.
    let commits = Arc::new(Mutex::new(Vec::new()));
    let delivers = Arc::new(Mutex::new(Vec::new()));
    let node = {
        let commits = commits.clone();
        let delivers = delivers.clone();
        NodeSpec::builder()
            .kv_store(MemDB::new())
            .configuration(configuration(None))
            .chain(MiddlewareChain::standard(FeeConfig::new(
                Coin::new(DENOM, 0),
                collector(),
            )))
            .dispatcher(
                Dispatcher::builder()
                    .handler(CoinHandler::new(DENOM))
                    .build()
                    .unwrap(),
            )
            .on_commit(move |event| commits.lock().unwrap().push((event.height, event.root)))
            .on_deliver_tx(move |event| delivers.lock().unwrap().push((event.height, event.code)))
            .build()
            .open()
            .unwrap()
    };

    // 2. Genesis commits height 1.
    node.init_chain(&[GenesisEntry::new(COIN, alice.genesis_address(), "10")])
        .unwrap();

    // 3. Deliver one good and one replayed transaction, then commit height 2.
    let tx = send(&alice, &bob.actor, 1, 1, 0);
    node.deliver_tx(&tx);
    node.deliver_tx(&tx);
    node.commit().unwrap();

    // 4. Both commits were reported with the roots the store recorded.
    let commits = commits.lock().unwrap();
    assert_eq!(commits.len(), 2);
    for (height, root) in commits.iter() {
        assert_eq!(*root, node.root_at(*height).unwrap());
    }

    // 5. Both deliver calls were reported at the working height, with their outcomes.
    assert_eq!(
        *delivers.lock().unwrap(),
        vec![
            (BlockHeight::new(2), ErrorCode::Ok),
            (BlockHeight::new(2), ErrorCode::RejectedByStage)
        ]
    );
}
