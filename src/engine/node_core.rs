// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::signal::Signal;
use crate::errors::StreamError;
use crate::scheduler::WeakDispatcher;
use crate::traits::{NodeId, StreamNode};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// State shared by every node: identity, links and the four signal lines.
///
/// Parent and child links are weak. The root producer's arena keeps nodes
/// alive; links only route signals.
pub struct NodeCore {
    id: NodeId,
    kind: &'static str,
    dispatcher: WeakDispatcher,
    this: Weak<dyn StreamNode>,
    parent: RefCell<Option<Weak<dyn StreamNode>>>,
    children: RefCell<Vec<Weak<dyn StreamNode>>>,
    in_flight: Cell<usize>,
    halted: Cell<bool>,
    pub(crate) next: Signal<Value>,
    pub(crate) error: Signal<StreamError>,
    pub(crate) finished: Signal<NodeId>,
    pub(crate) wait_over: Signal<()>,
}

impl NodeCore {
    pub fn new(kind: &'static str, dispatcher: WeakDispatcher, this: Weak<dyn StreamNode>) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            dispatcher,
            this,
            parent: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            in_flight: Cell::new(0),
            halted: Cell::new(false),
            next: Signal::default(),
            error: Signal::default(),
            finished: Signal::default(),
            wait_over: Signal::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn dispatcher(&self) -> &WeakDispatcher {
        &self.dispatcher
    }

    /// Strong handle to the node that owns this core.
    pub fn shared(&self) -> Option<Rc<dyn StreamNode>> {
        self.this.upgrade()
    }

    pub fn weak(&self) -> Weak<dyn StreamNode> {
        self.this.clone()
    }

    pub fn parent(&self) -> Option<Rc<dyn StreamNode>> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    pub(crate) fn set_parent(&self, parent: Weak<dyn StreamNode>) {
        *self.parent.borrow_mut() = Some(parent);
    }

    /// Live children; links to dropped children are pruned on the way.
    pub fn children(&self) -> Vec<Rc<dyn StreamNode>> {
        let mut children = self.children.borrow_mut();
        children.retain(|child| child.strong_count() > 0);
        children.iter().filter_map(Weak::upgrade).collect()
    }

    /// Link `child` below this node. A child already linked is not added again.
    pub(crate) fn add_child(&self, child: Weak<dyn StreamNode>) {
        let Some(id) = child.upgrade().map(|c| c.core().id()) else {
            return;
        };
        let mut children = self.children.borrow_mut();
        let linked = children
            .iter()
            .filter_map(Weak::upgrade)
            .any(|c| c.core().id() == id);
        if !linked {
            children.push(child);
        }
    }

    pub(crate) fn remove_child(&self, id: NodeId) {
        self.children
            .borrow_mut()
            .retain(|child| child.upgrade().is_some_and(|c| c.core().id() != id));
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    pub(crate) fn begin_delivery(&self) {
        self.in_flight.set(self.in_flight.get() + 1);
    }

    /// Called after a tracked value was handled. Pulses `waitOver` when the
    /// node has become idle.
    pub(crate) fn end_delivery(&self, node: &dyn StreamNode) {
        let remaining = self.in_flight.get().saturating_sub(1);
        self.in_flight.set(remaining);
        if remaining == 0 && !node.wait() {
            self.pulse_wait_over();
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.get()
    }

    /// Stop delivering to and emitting from this node for good.
    pub(crate) fn halt(&self) {
        self.halted.set(true);
    }

    pub fn emit_next(&self, value: Value) {
        if self.halted.get() {
            return;
        }
        tracing::trace!(node = %self.id, kind = self.kind, value = %value, "next");
        self.next.emit(&self.dispatcher, value);
    }

    pub fn emit_finished(&self, origin: NodeId) {
        self.finished.emit(&self.dispatcher, origin);
    }

    pub fn pulse_wait_over(&self) {
        self.wait_over.emit(&self.dispatcher, ());
    }
}

impl Drop for NodeCore {
    fn drop(&mut self) {
        // Anything parked on this node must get a chance to re-check.
        self.wait_over.emit(&self.dispatcher, ());
    }
}
