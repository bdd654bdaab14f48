/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The entry points a consensus engine and query callers drive.
//!
//! A [`Node`] wires a [`VersionedStore`], a [`MiddlewareChain`], and a [`Dispatcher`] together behind
//! the five calls of an application node:
//! - [`init_chain`](Node::init_chain): apply genesis and commit height 1. Called once.
//! - [`check_tx`](Node::check_tx): decide whether a transaction would be admissible, against the
//!   Check view.
//! - [`deliver_tx`](Node::deliver_tx): execute a transaction against the Deliver view.
//! - [`commit`](Node::commit): make everything delivered since the last commit durable as the next
//!   height. Called exactly once per block, after all of the block's deliver calls have returned.
//! - [`query`](Node::query): read a committed snapshot.
//!
//! All of them take `&self`, and `Node` is `Send + Sync`, so a node can be shared between threads in an
//! `Arc`. Check calls and queries run in parallel with everything. Deliver calls and commits are
//! serialized by the store.
//!
//! ## Building a node
//!
//! ```ignore
//! let node = NodeSpec::builder()
//!     .kv_store(kv_store)
//!     .configuration(configuration)
//!     .chain(MiddlewareChain::standard(fee_config))
//!     .dispatcher(dispatcher)
//!     .on_commit(commit_handler)
//!     .build()
//!     .open()?;
//! ```
//!
//! The [configuration](Configuration) can also be defined using the builder pattern, for example:
//!
//! ```ignore
//! let configuration = Configuration::builder()
//!     .chain_id(ChainID::new(0))
//!     .retain_heights(Some(100))
//!     .log_events(true)
//!     .build();
//! ```
//!
//! ## Before genesis
//!
//! Until `init_chain` has committed height 1, check calls, deliver calls, and commits are refused with
//! [`TxError::NotInitialized`]. Queries are answered as usual.
//!
//! ## Halting
//!
//! If a commit fails, the in-process views no longer match what is durable. The store then halts: the
//! failing commit and every later call return [`TxError::PersistenceFailure`], and the process must be
//! restarted from the last durable snapshot.

use std::{
    fmt::{self, Display},
    time::SystemTime,
};

use borsh::{BorshDeserialize, BorshSerialize};
use typed_builder::TypedBuilder;

use crate::{
    chain::MiddlewareChain,
    context::{CallKind, CallLogger, ExecutionContext},
    dispatcher::{Dispatcher, TxResult},
    errors::{ErrorCode, GenesisError, TxError},
    event_bus::{EventHandlers, HandlerPtr},
    events::*,
    genesis::{GenesisEntry, GenesisInitializer},
    query::{QueryEngine, QueryRequest, QueryResponse},
    store::{CommitError, KVStore, StoreError, VersionedStore},
    types::{
        data_types::{BlockHeight, ChainID, CryptoHash},
        transaction::Transaction,
    },
};

/// Stores the user-defined parameters of a node, that is:
/// 1. The [chain ID](ChainID) of the blockchain. Transactions signed for any other chain are rejected.
/// 2. The number of most recent heights to keep queryable. `None` keeps every height.
/// 3. The "Log Events" flag. If set to `true`, every [event](crate::events) is logged.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.chain_id(...)`
    - `.log_events(...)`

    Optional:
    - `.retain_heights(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the chain ID of the blockchain. Required."))]
    pub chain_id: ChainID,
    #[builder(
        default,
        setter(doc = "Set how many of the most recent heights stay queryable. Optional; defaults to every height.")
    )]
    pub retain_heights: Option<u64>,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

/// Stores all parameters and trait implementations required to open a [`Node`].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [NodeSpec]. On the builder call the following methods to construct a valid [NodeSpec].

    Required:
    - `.kv_store(...)`
    - `.configuration(...)`
    - `.chain(...)`
    - `.dispatcher(...)`

    Optional:
    - `.on_init_chain(...)`
    - `.on_check_tx(...)`
    - `.on_deliver_tx(...)`
    - `.on_commit(...)`
    - `.on_query(...)`
"))]
pub struct NodeSpec<K: KVStore> {
    // Required parameters
    #[builder(setter(doc = "Set the implementation of the node's key-value store. The argument must implement the [KVStore] trait. Required."))]
    kv_store: K,
    #[builder(setter(doc = "Set the [configuration](Configuration). Required."))]
    configuration: Configuration,
    #[builder(setter(doc = "Set the middleware chain transactions pass through. Required."))]
    chain: MiddlewareChain,
    #[builder(setter(doc = "Set the dispatcher that routes transactions to module handlers. Required."))]
    dispatcher: Dispatcher<K>,
    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&InitChainEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<InitChainEvent>),
    doc = "Register a handler closure to be invoked after genesis is committed. Optional."))]
    on_init_chain: Option<HandlerPtr<InitChainEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CheckTxEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<CheckTxEvent>),
    doc = "Register a handler closure to be invoked after every check call. Optional."))]
    on_check_tx: Option<HandlerPtr<CheckTxEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DeliverTxEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<DeliverTxEvent>),
    doc = "Register a handler closure to be invoked after every deliver call. Optional."))]
    on_deliver_tx: Option<HandlerPtr<DeliverTxEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CommitEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<CommitEvent>),
    doc = "Register a handler closure to be invoked after every commit. Optional."))]
    on_commit: Option<HandlerPtr<CommitEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&QueryEvent) + Send + Sync + 'static| Some(Box::new(handler) as HandlerPtr<QueryEvent>),
    doc = "Register a handler closure to be invoked after every query. Optional."))]
    on_query: Option<HandlerPtr<QueryEvent>>,
}

impl<K: KVStore> NodeSpec<K> {
    /// Open the node's store, resuming from whatever height its key-value store last committed.
    pub fn open(self) -> Result<Node<K>, StoreError> {
        let store = VersionedStore::open(self.kv_store, self.configuration.retain_heights)?;
        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_init_chain,
            self.on_check_tx,
            self.on_deliver_tx,
            self.on_commit,
            self.on_query,
        );

        Ok(Node {
            configuration: self.configuration,
            store,
            chain: self.chain,
            dispatcher: self.dispatcher,
            event_handlers,
        })
    }
}

pub struct Node<K: KVStore> {
    configuration: Configuration,
    store: VersionedStore<K>,
    chain: MiddlewareChain,
    dispatcher: Dispatcher<K>,
    event_handlers: EventHandlers,
}

impl<K: KVStore> Node<K> {
    /// Apply `entries` to the empty state and commit the result as height 1.
    ///
    /// Either every entry is applied and committed, or the state is left untouched.
    pub fn init_chain(&self, entries: &[GenesisEntry]) -> Result<BlockHeight, InitChainError> {
        self.ensure_running()?;

        let mut deliver = self.store.append().map_err(TxError::from)?;
        let committed = deliver.base_height();
        if committed != BlockHeight::init() {
            return Err(InitChainError::AlreadyInitialized(committed));
        }

        let ctx = ExecutionContext::new(
            self.configuration.chain_id,
            deliver.base_height() + 1,
            CallKind::Deliver,
            CallLogger::new("initchain"),
        );
        let entries_applied =
            GenesisInitializer::apply(&ctx, entries, &mut *deliver, &self.dispatcher)?;

        let height = self.finish_commit(self.store.commit_append(deliver))?;
        self.event_handlers
            .fire_handlers(Event::InitChain(InitChainEvent {
                timestamp: SystemTime::now(),
                height,
                entries_applied,
            }));
        Ok(height)
    }

    /// Decide whether the transaction encoded in `tx_bytes` would be admissible.
    ///
    /// Each check call works on a private fork of the Check view. If the call succeeds, its writes are
    /// folded back into the Check view, so that later check calls (but no concurrent ones) see them.
    pub fn check_tx(&self, tx_bytes: &[u8]) -> TxResponse {
        let (tx, module, result) = match self.decode(tx_bytes) {
            Ok((tx, hash)) => {
                let module = tx.module().clone();
                (hash, Some(module), self.run_check(&tx, hash))
            }
            Err(err) => (None, None, Err(err)),
        };

        let response = TxResponse::from(&result);
        self.event_handlers.fire_handlers(Event::CheckTx(CheckTxEvent {
            timestamp: SystemTime::now(),
            tx,
            module,
            code: response.error_code(),
        }));
        response
    }

    fn run_check(&self, tx: &Transaction, hash: Option<CryptoHash>) -> Result<TxResult, TxError> {
        self.ensure_running()?;

        let mut view = self.store.check()?;
        if view.base_height() == BlockHeight::init() {
            return Err(TxError::NotInitialized);
        }
        let ctx = self.context(CallKind::Check, view.base_height() + 1, hash);
        let result = self.chain.process(&ctx, &mut view, tx, &self.dispatcher);
        if result.is_ok() && !self.store.absorb_check(&view)? {
            ctx.logger()
                .debug("check view was reset by a commit, dropping this call's writes");
        }
        result
    }

    /// Execute the transaction encoded in `tx_bytes` against the Deliver view.
    ///
    /// Deliver calls are serialized with each other and with [`commit`](Self::commit).
    pub fn deliver_tx(&self, tx_bytes: &[u8]) -> TxResponse {
        let mut height = None;
        let (tx, module, result) = match self.decode(tx_bytes) {
            Ok((tx, hash)) => {
                let module = tx.module().clone();
                (hash, Some(module), self.run_deliver(&tx, hash, &mut height))
            }
            Err(err) => (None, None, Err(err)),
        };

        let response = TxResponse::from(&result);
        self.event_handlers
            .fire_handlers(Event::DeliverTx(DeliverTxEvent {
                timestamp: SystemTime::now(),
                tx,
                module,
                height: height.unwrap_or_default(),
                code: response.error_code(),
            }));
        response
    }

    fn run_deliver(
        &self,
        tx: &Transaction,
        hash: Option<CryptoHash>,
        height: &mut Option<BlockHeight>,
    ) -> Result<TxResult, TxError> {
        self.ensure_running()?;

        let mut deliver = self.store.append()?;
        if deliver.base_height() == BlockHeight::init() {
            return Err(TxError::NotInitialized);
        }
        let working_height = deliver.base_height() + 1;
        *height = Some(working_height);
        let ctx = self.context(CallKind::Deliver, working_height, hash);
        self.chain
            .process(&ctx, &mut *deliver, tx, &self.dispatcher)
    }

    /// Commit everything delivered since the last commit as the next height, and return that height.
    pub fn commit(&self) -> Result<BlockHeight, TxError> {
        self.ensure_running()?;

        let deliver = self.store.append()?;
        if deliver.base_height() == BlockHeight::init() {
            return Err(TxError::NotInitialized);
        }
        self.finish_commit(self.store.commit_append(deliver))
    }

    fn finish_commit(
        &self,
        result: Result<BlockHeight, CommitError>,
    ) -> Result<BlockHeight, TxError> {
        let height = match result {
            Ok(height) => height,
            Err(err) => {
                log::error!("commit failed, halting: {}", err);
                return Err(TxError::PersistenceFailure(err.to_string()));
            }
        };

        let root = self.store.root_at(height)?;
        self.event_handlers.fire_handlers(Event::Commit(CommitEvent {
            timestamp: SystemTime::now(),
            height,
            root,
        }));
        Ok(height)
    }

    /// Answer the Borsh-encoded [`QueryRequest`] in `request_bytes`.
    pub fn query(&self, request_bytes: &[u8]) -> QueryResponse {
        let (path, height, result) = match QueryRequest::decode(request_bytes) {
            Ok(request) => {
                let result = self
                    .ensure_running()
                    .and_then(|_| QueryEngine::handle(&self.store, &request));
                (request.path, request.height, result)
            }
            Err(err) => (
                String::from("-"),
                0,
                Err(TxError::MalformedInput(format!("undecodable query: {}", err))),
            ),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => QueryResponse::error(&err),
        };
        self.event_handlers.fire_handlers(Event::Query(QueryEvent {
            timestamp: SystemTime::now(),
            path,
            height,
            code: ErrorCode::from_code(response.code).unwrap_or(ErrorCode::InternalFault),
        }));
        response
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn store(&self) -> &VersionedStore<K> {
        &self.store
    }

    pub fn committed_height(&self) -> Result<BlockHeight, TxError> {
        Ok(self.store.committed_height()?)
    }

    /// The height the next commit will produce.
    pub fn working_height(&self) -> Result<BlockHeight, TxError> {
        Ok(self.store.working_height()?)
    }

    /// Merkle root of the snapshot at `height`.
    pub fn root_at(&self, height: BlockHeight) -> Result<CryptoHash, TxError> {
        Ok(self.store.root_at(height)?)
    }

    /// Whether a commit has failed. See [`VersionedStore::is_halted`].
    pub fn is_halted(&self) -> bool {
        self.store.is_halted()
    }

    fn ensure_running(&self) -> Result<(), TxError> {
        if self.is_halted() {
            return Err(TxError::PersistenceFailure(String::from(
                "node halted after a failed commit",
            )));
        }
        Ok(())
    }

    fn decode(&self, tx_bytes: &[u8]) -> Result<(Transaction, Option<CryptoHash>), TxError> {
        let tx = Transaction::decode(tx_bytes)
            .map_err(|err| TxError::MalformedInput(format!("undecodable transaction: {}", err)))?;
        let hash = tx.envelope.hash().ok();
        Ok((tx, hash))
    }

    fn context(
        &self,
        kind: CallKind,
        height: BlockHeight,
        hash: Option<CryptoHash>,
    ) -> ExecutionContext {
        let ctx = ExecutionContext::new(
            self.configuration.chain_id,
            height,
            kind,
            CallLogger::new(kind.as_str()),
        );
        match hash {
            Some(hash) => ctx.with_tx_hash(hash),
            None => ctx,
        }
    }
}

/// Outcome of a check or deliver call, as reported to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxResponse {
    /// [`ErrorCode`] of the call, 0 on success.
    pub code: u32,

    /// The handler's log on success, or a description of the error.
    pub log: String,
    pub data: Vec<u8>,
}

impl TxResponse {
    pub fn is_ok(&self) -> bool {
        self.code == ErrorCode::Ok.code()
    }

    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from_code(self.code).unwrap_or(ErrorCode::InternalFault)
    }
}

impl From<&Result<TxResult, TxError>> for TxResponse {
    fn from(result: &Result<TxResult, TxError>) -> Self {
        match result {
            Ok(result) => TxResponse {
                code: ErrorCode::Ok.code(),
                log: result.log.clone(),
                data: result.data.clone(),
            },
            Err(err) => TxResponse {
                code: err.code().code(),
                log: err.to_string(),
                data: Vec::new(),
            },
        }
    }
}

/// Error returned by [`Node::init_chain`].
#[derive(Debug)]
pub enum InitChainError {
    /// Genesis has already been committed; the node is at the contained height.
    AlreadyInitialized(BlockHeight),
    Genesis(GenesisError),
    Tx(TxError),
}

impl From<GenesisError> for InitChainError {
    fn from(value: GenesisError) -> Self {
        InitChainError::Genesis(value)
    }
}

impl From<TxError> for InitChainError {
    fn from(value: TxError) -> Self {
        InitChainError::Tx(value)
    }
}

impl Display for InitChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitChainError::AlreadyInitialized(height) => {
                write!(f, "genesis already committed, node is at height {}", height)
            }
            InitChainError::Genesis(err) => write!(f, "{}", err),
            InitChainError::Tx(err) => write!(f, "{}", err),
        }
    }
}
