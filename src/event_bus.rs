/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Registry of event handlers, and the function that fires them.

use crate::{events::*, logging::Logger};

pub type HandlerPtr<T> = Box<dyn Fn(&T) + Send + Sync>;

#[derive(Default)]
pub(crate) struct EventHandlers {
    pub(crate) init_chain_handlers: Vec<HandlerPtr<InitChainEvent>>,
    pub(crate) check_tx_handlers: Vec<HandlerPtr<CheckTxEvent>>,
    pub(crate) deliver_tx_handlers: Vec<HandlerPtr<DeliverTxEvent>>,
    pub(crate) commit_handlers: Vec<HandlerPtr<CommitEvent>>,
    pub(crate) query_handlers: Vec<HandlerPtr<QueryEvent>>,
}

impl EventHandlers {
    /// Collect the user's handlers, preceded by the default loggers if `log_events` is set.
    pub(crate) fn new(
        log_events: bool,
        init_chain_handler: Option<HandlerPtr<InitChainEvent>>,
        check_tx_handler: Option<HandlerPtr<CheckTxEvent>>,
        deliver_tx_handler: Option<HandlerPtr<DeliverTxEvent>>,
        commit_handler: Option<HandlerPtr<CommitEvent>>,
        query_handler: Option<HandlerPtr<QueryEvent>>,
    ) -> EventHandlers {
        let mut handlers = EventHandlers::default();

        if log_events {
            handlers.init_chain_handlers.push(InitChainEvent::get_logger());
            handlers.check_tx_handlers.push(CheckTxEvent::get_logger());
            handlers.deliver_tx_handlers.push(DeliverTxEvent::get_logger());
            handlers.commit_handlers.push(CommitEvent::get_logger());
            handlers.query_handlers.push(QueryEvent::get_logger());
        }

        handlers.init_chain_handlers.extend(init_chain_handler);
        handlers.check_tx_handlers.extend(check_tx_handler);
        handlers.deliver_tx_handlers.extend(deliver_tx_handler);
        handlers.commit_handlers.extend(commit_handler);
        handlers.query_handlers.extend(query_handler);

        handlers
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::InitChain(init_chain_event) => self
                .init_chain_handlers
                .iter()
                .for_each(|handler| handler(&init_chain_event)),

            Event::CheckTx(check_tx_event) => self
                .check_tx_handlers
                .iter()
                .for_each(|handler| handler(&check_tx_event)),

            Event::DeliverTx(deliver_tx_event) => self
                .deliver_tx_handlers
                .iter()
                .for_each(|handler| handler(&deliver_tx_event)),

            Event::Commit(commit_event) => self
                .commit_handlers
                .iter()
                .for_each(|handler| handler(&commit_event)),

            Event::Query(query_event) => self
                .query_handlers
                .iter()
                .for_each(|handler| handler(&query_event)),
        }
    }
}
