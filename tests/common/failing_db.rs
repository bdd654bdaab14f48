//! A [`KVStore`] whose writes can be made to fail, or to stall, on demand, for exercising the
//! halt-on-commit-failure path.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use txstack::store::{
    mem_db::MemWriteBatch, KVGet, KVStore, KVWriteError, MemDB,
};

#[derive(Clone, Default)]
pub(crate) struct FailingDB {
    inner: MemDB,
    failing: Arc<AtomicBool>,
    holding: Arc<AtomicBool>,
    entered: Arc<AtomicBool>,
}

impl FailingDB {
    pub(crate) fn new() -> FailingDB {
        FailingDB::default()
    }

    /// Make every subsequent write fail.
    pub(crate) fn start_failing(&self) {
        self.failing.store(true, Ordering::SeqCst)
    }

    /// Make every subsequent write wait until [`release_writes`](Self::release_writes) is called.
    pub(crate) fn hold_writes(&self) {
        self.holding.store(true, Ordering::SeqCst)
    }

    pub(crate) fn release_writes(&self) {
        self.holding.store(false, Ordering::SeqCst)
    }

    /// Block until a write is waiting on [`hold_writes`](Self::hold_writes).
    pub(crate) fn wait_until_write_entered(&self) {
        while !self.entered.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl KVStore for FailingDB {
    type WriteBatch = MemWriteBatch;

    fn write(&mut self, wb: Self::WriteBatch) -> Result<(), KVWriteError> {
        if self.holding.load(Ordering::SeqCst) {
            self.entered.store(true, Ordering::SeqCst);
            while self.holding.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(KVWriteError("disk full".to_string()));
        }
        self.inner.write(wb)
    }
}

impl KVGet for FailingDB {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key)
    }
}
