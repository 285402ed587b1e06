// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Building and walking the node tree.

use crate::engine::NodeCore;
use crate::observability::messages::engine::DetachedNode;
use crate::observability::messages::StructuredLog;
use crate::traits::StreamNode;
use std::rc::{Rc, Weak};

/// Every node below `core`'s node, children after their own descendants.
pub fn descendants(core: &NodeCore) -> Vec<Rc<dyn StreamNode>> {
    let mut out = Vec::new();
    collect(core, &mut out);
    out
}

fn collect(core: &NodeCore, out: &mut Vec<Rc<dyn StreamNode>>) {
    for child in core.children() {
        collect(child.core(), out);
        out.push(child);
    }
}

/// Busy means queued input or work of its own.
pub fn is_busy(node: &dyn StreamNode) -> bool {
    node.core().in_flight() > 0 || node.wait()
}

/// Attach `child` below `parent` and hand it to the root's arena.
pub(crate) fn link(parent: &Rc<dyn StreamNode>, child: &Rc<dyn StreamNode>) {
    child.core().set_parent(Rc::downgrade(parent));
    parent.core().add_child(Rc::downgrade(child));
    match parent.root() {
        Some(root) => root.producer_core().adopt(Rc::clone(child)),
        None => DetachedNode {
            node_id: child.core().id().get(),
            kind: child.core().kind(),
            operation: "attach",
        }
        .log(),
    }
}

/// Track `child` for broadcast and liveness without taking it into the
/// arena. The child is re-parented only if it has no parent yet.
pub(crate) fn track_child(parent: &Rc<dyn StreamNode>, child: &Rc<dyn StreamNode>) {
    if !child.core().has_parent() {
        child.core().set_parent(Rc::downgrade(parent));
    }
    parent.core().add_child(Rc::downgrade(child));
}

/// Build an operator node of type `T` below `parent`.
pub(crate) fn attach<T, F>(parent: &Rc<dyn StreamNode>, kind: &'static str, build: F) -> Rc<T>
where
    T: StreamNode,
    F: FnOnce(NodeCore) -> T,
{
    let dispatcher = parent.core().dispatcher().clone();
    let node = Rc::new_cyclic(|weak: &Weak<T>| {
        let this: Weak<dyn StreamNode> = weak.clone();
        build(NodeCore::new(kind, dispatcher, this))
    });
    let as_node: Rc<dyn StreamNode> = node.clone();
    link(parent, &as_node);
    node
}

/// Relay the parent's `finished` to `child` unchanged.
pub(crate) fn forward_finished(parent: &Rc<dyn StreamNode>, child: &Rc<dyn StreamNode>) {
    let weak = Rc::downgrade(child);
    parent.core().finished.connect(move |origin| {
        if let Some(child) = weak.upgrade() {
            child.core().emit_finished(origin);
        }
    });
}
