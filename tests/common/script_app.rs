//! A module whose transactions poke at the store in controlled ways: plain writes, writes that
//! rendezvous with another thread, writes that stall until released, rejections, and panics.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Duration,
};

use borsh::{BorshDeserialize, BorshSerialize};
use txstack::{
    context::ExecutionContext,
    dispatcher::{Handler, TxResult},
    errors::HandlerError,
    store::{KVStore, View},
    types::{
        data_types::{ChainID, ModuleTag},
        transaction::{Envelope, Payload, Transaction},
    },
};

pub(crate) const SCRIPT: &str = "script";

/// A genesis entry with this key is written and then panics.
pub(crate) const PANIC_KEY: &str = "panic";

#[derive(BorshSerialize, BorshDeserialize)]
pub(crate) enum ScriptTx {
    /// Write `value` at `key`.
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Write `key`, wait for a second thread to reach the barrier, then report in the result data
    /// whether `other` is visible (`[1]`) or not (`[0]`).
    PutAndMeet {
        key: Vec<u8>,
        value: Vec<u8>,
        other: Vec<u8>,
    },

    /// Write `first`, raise the started flag, wait for the release flag, then write `second`.
    PutAndStall { first: Vec<u8>, second: Vec<u8> },

    /// Write `key`, then reject.
    PutAndReject { key: Vec<u8> },

    /// Write `key`, then panic.
    PutAndPanic { key: Vec<u8> },
}

impl ScriptTx {
    pub(crate) fn to_bytes(&self, chain_id: ChainID) -> Vec<u8> {
        let envelope = Envelope::new(chain_id, Payload::new(SCRIPT, self.try_to_vec().unwrap()));
        Transaction::new(envelope).encode().unwrap()
    }
}

/// Shared handles the test thread uses to steer a [`ScriptHandler`].
#[derive(Clone)]
pub(crate) struct ScriptControls {
    pub(crate) barrier: Arc<Barrier>,
    pub(crate) started: Arc<AtomicBool>,
    pub(crate) release: Arc<AtomicBool>,
}

impl ScriptControls {
    pub(crate) fn new(parties: usize) -> ScriptControls {
        ScriptControls {
            barrier: Arc::new(Barrier::new(parties)),
            started: Arc::new(AtomicBool::new(false)),
            release: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn wait_until_started(&self) {
        while !self.started.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub(crate) fn release(&self) {
        self.release.store(true, Ordering::SeqCst)
    }
}

pub(crate) struct ScriptHandler {
    controls: ScriptControls,
}

impl ScriptHandler {
    pub(crate) fn new(controls: ScriptControls) -> ScriptHandler {
        ScriptHandler { controls }
    }

    fn execute<K: KVStore>(
        &self,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        let script = ScriptTx::try_from_slice(&tx.envelope.payload.body)
            .map_err(|err| HandlerError::rejected(err.to_string()))?;

        match script {
            ScriptTx::Put { key, value } => {
                view.set(&key, &value);
                Ok(TxResult::new(Vec::new(), "put"))
            }
            ScriptTx::PutAndMeet { key, value, other } => {
                view.set(&key, &value);
                self.controls.barrier.wait();
                let seen = view.get(&other)?.is_some();
                // Hold the fork until the other thread has also looked.
                self.controls.barrier.wait();
                Ok(TxResult::new(vec![seen as u8], "met"))
            }
            ScriptTx::PutAndStall { first, second } => {
                view.set(&first, b"1");
                self.controls.started.store(true, Ordering::SeqCst);
                while !self.controls.release.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(5));
                }
                view.set(&second, b"2");
                Ok(TxResult::new(Vec::new(), "stalled"))
            }
            ScriptTx::PutAndReject { key } => {
                view.set(&key, b"rejected");
                Err(HandlerError::rejected("script says no"))
            }
            ScriptTx::PutAndPanic { key } => {
                view.set(&key, b"panicked");
                panic!("script panicked")
            }
        }
    }
}

impl<K: KVStore> Handler<K> for ScriptHandler {
    fn module(&self) -> ModuleTag {
        ModuleTag::from(SCRIPT)
    }

    fn init_state(
        &self,
        _ctx: &ExecutionContext,
        view: &mut View<K>,
        key: &str,
        value: &str,
    ) -> Result<String, HandlerError> {
        view.set(key.as_bytes(), value.as_bytes());
        if key == PANIC_KEY {
            panic!("genesis entry {} panicked", key)
        }
        Ok(format!("put {}", key))
    }

    fn check_tx(
        &self,
        _ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        self.execute(view, tx)
    }

    fn deliver_tx(
        &self,
        _ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        self.execute(view, tx)
    }
}
