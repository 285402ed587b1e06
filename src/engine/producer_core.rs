// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::ownership::{OwnedResource, Ownership};
use crate::engine::signal::{Signal, SlotId};
use crate::errors::StreamError;
use crate::observability::messages::engine::{CallbacksDropped, ResourcesReleased};
use crate::observability::messages::StructuredLog;
use crate::traits::{NodeId, Producer, Request, StreamNode};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

pub type CompletionCallback = Box<dyn FnOnce()>;
pub type ErrorHandler = Rc<dyn Fn(&StreamError)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Idle,
    Requesting,
    Deferred,
    Completing,
    Completed,
    Cancelled,
}

/// Producer half of a node: the request contract, held callbacks, the arena
/// of nodes attached below it and its ownership records.
pub struct ProducerCore {
    id: NodeId,
    this: Weak<dyn Producer>,
    state: Cell<ProducerState>,
    last_request: Cell<Request>,
    completions: RefCell<VecDeque<CompletionCallback>>,
    error_handler: RefCell<Option<ErrorHandler>>,
    pending_drain: RefCell<Option<(Weak<dyn StreamNode>, SlotId)>>,
    fatal_seen: Cell<bool>,
    arena: RefCell<Vec<Rc<dyn StreamNode>>>,
    ownership: Ownership,
    pub(crate) completed: Signal<NodeId>,
}

impl ProducerCore {
    pub fn new(id: NodeId, this: Weak<dyn Producer>, initial: Request) -> Self {
        Self {
            id,
            this,
            state: Cell::new(ProducerState::Idle),
            last_request: Cell::new(initial),
            completions: RefCell::new(VecDeque::new()),
            error_handler: RefCell::new(None),
            pending_drain: RefCell::new(None),
            fatal_seen: Cell::new(false),
            arena: RefCell::new(Vec::new()),
            ownership: Ownership::default(),
            completed: Signal::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn shared(&self) -> Option<Rc<dyn Producer>> {
        self.this.upgrade()
    }

    pub fn state(&self) -> ProducerState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: ProducerState) {
        self.state.set(state);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state.get(),
            ProducerState::Completed | ProducerState::Cancelled
        )
    }

    /// Record a request. Defers are not remembered, so `request_again`
    /// resumes with the last real request.
    pub fn remember(&self, request: Request) {
        if self.is_terminal() || self.state.get() == ProducerState::Completing {
            return;
        }
        match request {
            Request::Defer => self.state.set(ProducerState::Deferred),
            other => {
                self.last_request.set(other);
                self.state.set(ProducerState::Requesting);
            }
        }
    }

    pub fn last_request(&self) -> Request {
        self.last_request.get()
    }

    pub fn is_deferred(&self) -> bool {
        self.state.get() == ProducerState::Deferred
    }

    pub fn push_completion(&self, callback: CompletionCallback) {
        self.completions.borrow_mut().push_back(callback);
    }

    pub fn completion_count(&self) -> usize {
        self.completions.borrow().len()
    }

    pub(crate) fn take_completions(&self) -> VecDeque<CompletionCallback> {
        std::mem::take(&mut *self.completions.borrow_mut())
    }

    pub(crate) fn clear_completions(&self) {
        let dropped = self.take_completions();
        drop(dropped);
    }

    pub fn set_error_handler(&self, handler: ErrorHandler) {
        *self.error_handler.borrow_mut() = Some(handler);
    }

    pub(crate) fn clear_error_handler(&self) {
        let dropped = self.error_handler.borrow_mut().take();
        drop(dropped);
    }

    pub fn error_handler(&self) -> Option<ErrorHandler> {
        self.error_handler.borrow().clone()
    }

    pub(crate) fn fatal_seen(&self) -> bool {
        self.fatal_seen.get()
    }

    pub(crate) fn mark_fatal(&self) {
        self.fatal_seen.set(true);
    }

    /// Park the drain on `node`, replacing any earlier parking spot.
    pub(crate) fn park_drain(&self, node: &Rc<dyn StreamNode>, slot: SlotId) {
        self.unpark_drain();
        *self.pending_drain.borrow_mut() = Some((Rc::downgrade(node), slot));
    }

    pub(crate) fn unpark_drain(&self) {
        let parked = self.pending_drain.borrow_mut().take();
        if let Some((node, slot)) = parked {
            if let Some(node) = node.upgrade() {
                node.core().wait_over.disconnect(slot);
            }
        }
    }

    /// Keep `node` alive for as long as this producer lives.
    pub(crate) fn adopt(&self, node: Rc<dyn StreamNode>) {
        self.arena.borrow_mut().push(node);
    }

    pub fn own(&self, record: OwnedResource) {
        self.ownership.push(record);
    }

    pub fn owned_count(&self) -> usize {
        self.ownership.len()
    }

    pub(crate) fn take_owned(&self) -> Vec<OwnedResource> {
        self.ownership.take_all()
    }

    pub(crate) fn extend_owned(&self, records: Vec<OwnedResource>) {
        self.ownership.extend(records);
    }
}

impl Drop for ProducerCore {
    fn drop(&mut self) {
        let leftover = self.completions.get_mut().len();
        if leftover > 0 {
            CallbacksDropped {
                producer_id: self.id.get(),
                count: leftover,
            }
            .log();
            self.completions.get_mut().clear();
        }

        let count = self.ownership.release_all();
        if count > 0 {
            ResourcesReleased {
                producer_id: self.id.get(),
                count,
            }
            .log();
        }
    }
}
