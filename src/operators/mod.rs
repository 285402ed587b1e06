// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Operators: nodes attached below a parent that transform, gate or fan out
//! its values.
//!
//! Stateless operators are all a [`Relay`]: a bare node whose behaviour lives
//! in the closure subscribed to the parent's `next`. Operators with state of
//! their own (pending timers, partial batches, half-filled rounds) are
//! dedicated node types that override `wait()` so a completing producer waits
//! for them.
//!
//! An operator that can still emit after its parent finished holds the
//! parent's `finished` in a [`FinishGate`] until it is idle, so nodes below it
//! never see `finished` ahead of its last value.

pub mod buffer;
pub mod delay;
pub mod info;
pub mod iterate;
pub mod scan;
pub mod simple;
pub mod spawn;
pub mod split;
pub mod wait;

pub use buffer::Buffer;
pub use delay::Delay;
pub use iterate::Iterate;
pub use scan::Scan;
pub use split::Split;
pub use wait::{WaitOp, Waiter};

use crate::engine::graph::{attach, forward_finished};
use crate::engine::NodeCore;
use crate::traits::{NodeId, StreamNode};
use crate::value::Value;
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// A node with no state beyond its core.
pub struct Relay {
    core: NodeCore,
}

impl StreamNode for Relay {
    fn core(&self) -> &NodeCore {
        &self.core
    }
}

/// Attach a [`Relay`] below `parent` that hands every parent value to
/// `on_value` and passes `finished` straight through.
pub(crate) fn relay(
    parent: &Rc<dyn StreamNode>,
    kind: &'static str,
    on_value: impl Fn(&Rc<Relay>, Value) + 'static,
) -> Rc<Relay> {
    let node = attach(parent, kind, |core| Relay { core });
    subscribe_next(parent, &node, on_value);
    let child: Rc<dyn StreamNode> = node.clone();
    forward_finished(parent, &child);
    node
}

/// Deliver `parent`'s values to `node` with in-flight tracking.
pub(crate) fn subscribe_next<T: StreamNode>(
    parent: &Rc<dyn StreamNode>,
    node: &Rc<T>,
    on_value: impl Fn(&Rc<T>, Value) + 'static,
) {
    let weak: Weak<T> = Rc::downgrade(node);
    let receiver: Weak<dyn StreamNode> = weak.clone();
    parent.core().next.connect_tracked(receiver, move |value| {
        if let Some(node) = weak.upgrade() {
            on_value(&node, value);
        }
    });
}

/// Deliver `parent`'s `finished` to `node`.
pub(crate) fn subscribe_finished<T: StreamNode>(
    parent: &Rc<dyn StreamNode>,
    node: &Rc<T>,
    on_finished: impl Fn(&Rc<T>, NodeId) + 'static,
) {
    let weak: Weak<T> = Rc::downgrade(node);
    parent.core().finished.connect(move |origin| {
        if let Some(node) = weak.upgrade() {
            on_finished(&node, origin);
        }
    });
}

/// Holds a parent's `finished` until the owning operator is idle.
#[derive(Default)]
pub(crate) struct FinishGate {
    held: Cell<Option<NodeId>>,
}

impl FinishGate {
    pub(crate) fn arrive(&self, core: &NodeCore, origin: NodeId, idle: bool) {
        if idle {
            core.emit_finished(origin);
        } else {
            self.held.set(Some(origin));
        }
    }

    /// Forward a held `finished`, if any.
    pub(crate) fn release(&self, core: &NodeCore) {
        if let Some(origin) = self.held.take() {
            core.emit_finished(origin);
        }
    }
}
