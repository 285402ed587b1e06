// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::NodeCore;
use crate::traits::Producer;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a node, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in a rooted stream graph.
///
/// Implementors embed a [`NodeCore`] for parent/child bookkeeping and the
/// signal lines, and override `wait`/`cancel` when they hold work of their own.
pub trait StreamNode: 'static {
    fn core(&self) -> &NodeCore;

    /// `Some(self)` when this node is itself a producer.
    fn as_producer(&self) -> Option<Rc<dyn Producer>> {
        None
    }

    /// The nearest producer at or above this node.
    fn producer(&self) -> Option<Rc<dyn Producer>> {
        self.as_producer()
            .or_else(|| self.core().parent().and_then(|parent| parent.producer()))
    }

    /// The producer at the top of the tree.
    fn root(&self) -> Option<Rc<dyn Producer>> {
        match self.core().parent() {
            Some(parent) => parent.root(),
            None => self.as_producer(),
        }
    }

    /// True while this node holds work that must finish before an ancestor
    /// may declare itself drained.
    fn wait(&self) -> bool {
        false
    }

    /// Abandon pending work.
    fn cancel(&self) {}
}
