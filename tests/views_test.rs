use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use log::LevelFilter;
use txstack::{
    errors::ErrorCode, genesis::GenesisEntry, modules::coin::COIN, store::MemDB,
    types::data_types::BlockHeight,
};

mod common;

use crate::common::{
    keys::Account,
    logging::setup_logger,
    node::{bank_node, script_node, query, send, CHAIN_ID},
    script_app::{ScriptControls, ScriptTx},
};

#[test]
fn concurrent_checks_are_isolated_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Two check calls each write their own key, meet at a barrier, then look for the other's key.
    let controls = ScriptControls::new(2);
    let node = Arc::new(script_node(controls, None));
    node.init_chain(&[]).unwrap();

    let handles: Vec<_> = [(b"left", b"rght"), (b"rght", b"left")]
        .into_iter()
        .map(|(key, other)| {
            let node = node.clone();
            let tx = ScriptTx::PutAndMeet {
                key: key.to_vec(),
                value: b"v".to_vec(),
                other: other.to_vec(),
            }
            .to_bytes(CHAIN_ID);
            thread::spawn(move || node.check_tx(&tx))
        })
        .collect();

    // 2. Neither saw the other's write.
    for handle in handles {
        let response = handle.join().unwrap();
        assert!(response.is_ok(), "{}", response.log);
        assert_eq!(response.data, vec![0]);
    }

    // 3. Check writes never reach a committed snapshot.
    node.commit().unwrap();
    assert_eq!(query(&node, b"left", 0, false).index, -1);
    assert_eq!(query(&node, b"rght", 0, false).index, -1);
}

#[test]
fn commit_waits_for_running_deliver_test() {
    setup_logger(LevelFilter::Trace);

    let controls = ScriptControls::new(1);
    let node = Arc::new(script_node(controls.clone(), None));
    node.init_chain(&[]).unwrap();

    // 1. Start a deliver call that writes "first", then stalls before writing "second".
    let deliver = {
        let node = node.clone();
        let tx = ScriptTx::PutAndStall {
            first: b"first".to_vec(),
            second: b"second".to_vec(),
        }
        .to_bytes(CHAIN_ID);
        thread::spawn(move || node.deliver_tx(&tx))
    };
    controls.wait_until_started();

    // 2. Request a commit while the deliver call is stalled.
    let committed = Arc::new(AtomicBool::new(false));
    let commit = {
        let node = node.clone();
        let committed = committed.clone();
        thread::spawn(move || {
            let height = node.commit();
            committed.store(true, Ordering::SeqCst);
            height
        })
    };

    // 3. The commit must not complete until the deliver call returns.
    thread::sleep(Duration::from_millis(200));
    assert!(!committed.load(Ordering::SeqCst));

    controls.release();
    assert!(deliver.join().unwrap().is_ok());
    assert_eq!(commit.join().unwrap().unwrap(), BlockHeight::new(2));

    // 4. Both writes landed in the same height.
    assert_eq!(query(&node, b"first", 2, false).value, b"1".to_vec());
    assert_eq!(query(&node, b"second", 2, false).value, b"2".to_vec());
}

#[test]
fn check_and_deliver_agree_test() {
    setup_logger(LevelFilter::Trace);

    let alice = Account::generate();
    let bob = Account::generate();
    let node = bank_node(MemDB::new(), 1);
    node.init_chain(&[GenesisEntry::new(COIN, alice.genesis_address(), "100")])
        .unwrap();

    // A mix of transactions that pass and fail at different points of the chain.
    let txs = vec![
        send(&alice, &bob.actor, 10, 1, 1),
        send(&alice, &bob.actor, 10, 1, 1),
        send(&alice, &bob.actor, 10, 2, 0),
        send(&alice, &bob.actor, 1000, 2, 1),
        send(&alice, &bob.actor, 20, 2, 1),
        send(&bob, &alice.actor, 5, 1, 1),
        vec![0xff; 4],
    ];

    // Starting from the same state, the Check view and the Deliver view reach the same verdicts.
    for tx in &txs {
        let checked = node.check_tx(tx);
        let delivered = node.deliver_tx(tx);
        assert_eq!(checked.code, delivered.code, "{} / {}", checked.log, delivered.log);
    }
}

#[test]
fn commit_resets_check_view_test() {
    setup_logger(LevelFilter::Trace);

    let alice = Account::generate();
    let bob = Account::generate();
    let node = bank_node(MemDB::new(), 0);
    node.init_chain(&[GenesisEntry::new(COIN, alice.genesis_address(), "100")])
        .unwrap();

    // 1. A check call uses sequence 1 in the Check view.
    let tx = send(&alice, &bob.actor, 10, 1, 0);
    assert!(node.check_tx(&tx).is_ok());
    assert_eq!(node.check_tx(&tx).error_code(), ErrorCode::RejectedByStage);

    // 2. The transaction never gets delivered. After the commit, the Check view matches the committed
    //    state again, where sequence 1 is still unused.
    node.commit().unwrap();
    assert!(node.check_tx(&tx).is_ok());
}

#[test]
fn failed_calls_leave_no_writes_test() {
    setup_logger(LevelFilter::Trace);

    let node = script_node(ScriptControls::new(1), None);
    node.init_chain(&[]).unwrap();

    // 1. A handler that writes and then rejects.
    let response = node.deliver_tx(
        &ScriptTx::PutAndReject {
            key: b"rejected".to_vec(),
        }
        .to_bytes(CHAIN_ID),
    );
    assert_eq!(response.error_code(), ErrorCode::HandlerRejected);

    // 2. A handler that writes and then panics. The panic does not escape the node.
    let response = node.deliver_tx(
        &ScriptTx::PutAndPanic {
            key: b"panicked".to_vec(),
        }
        .to_bytes(CHAIN_ID),
    );
    assert_eq!(response.error_code(), ErrorCode::InternalFault);

    // 3. The node keeps working.
    let response = node.deliver_tx(
        &ScriptTx::Put {
            key: b"kept".to_vec(),
            value: b"yes".to_vec(),
        }
        .to_bytes(CHAIN_ID),
    );
    assert!(response.is_ok(), "{}", response.log);

    node.commit().unwrap();
    assert_eq!(query(&node, b"rejected", 0, false).index, -1);
    assert_eq!(query(&node, b"panicked", 0, false).index, -1);
    assert_eq!(query(&node, b"kept", 0, false).value, b"yes".to_vec());
}
