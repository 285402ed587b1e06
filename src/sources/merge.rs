// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fan-in of several streams.
//!
//! Each source's producer is tracked as a child of the merge, so errors raised
//! inside a source reach the merge's handlers and the merge's drain sees the
//! sources' work. The merge completes once every source's producer has
//! completed. Several sources may share one producer; such a group leaves the
//! set only when the shared producer has reported completion to all of them.

use crate::engine::graph::track_child;
use crate::engine::{drain, NodeCore, ProducerCore};
use crate::scheduler::Dispatcher;
use crate::traits::{NodeId, Producer, Request, StreamNode};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

struct MergeSource {
    node: Rc<dyn StreamNode>,
    producer: Weak<dyn Producer>,
    producer_id: NodeId,
    notified: Cell<bool>,
}

pub struct Merge {
    core: NodeCore,
    producer: ProducerCore,
    sources: RefCell<Vec<MergeSource>>,
}

impl Merge {
    pub(crate) fn spawn(dispatcher: &Dispatcher, sources: Vec<Rc<dyn StreamNode>>) -> Rc<Self> {
        let weak_dispatcher = dispatcher.downgrade();
        let merge = Rc::new_cyclic(|weak: &Weak<Self>| {
            let node: Weak<dyn StreamNode> = weak.clone();
            let producer: Weak<dyn Producer> = weak.clone();
            let core = NodeCore::new("merge", weak_dispatcher, node);
            Self {
                producer: ProducerCore::new(core.id(), producer, Request::One),
                core,
                sources: RefCell::new(Vec::new()),
            }
        });

        let as_node: Rc<dyn StreamNode> = merge.clone();
        for source in sources {
            merge.add_source(&as_node, source);
        }
        dispatcher.retain(as_node);

        if merge.sources.borrow().is_empty() {
            let weak = Rc::downgrade(&merge);
            dispatcher.post(move || {
                if let Some(merge) = weak.upgrade() {
                    merge.complete_self();
                }
            });
        }
        merge
    }

    fn add_source(self: &Rc<Self>, as_node: &Rc<dyn StreamNode>, source: Rc<dyn StreamNode>) {
        let Some(producer) = source.producer() else {
            tracing::warn!(node = %source.core().id(), kind = source.core().kind(), "merge source has no producer, skipped");
            return;
        };
        let producer_node: Rc<dyn StreamNode> = producer.clone();
        track_child(as_node, &producer_node);

        let weak = Rc::downgrade(self);
        source
            .core()
            .next
            .connect_tracked(Rc::downgrade(as_node), move |value| {
                if let Some(merge) = weak.upgrade() {
                    merge.core.emit_next(value);
                }
            });

        let weak = Rc::downgrade(self);
        let source_id = source.core().id();
        producer.producer_core().completed.connect(move |producer_id| {
            if let Some(merge) = weak.upgrade() {
                merge.source_completed(source_id, producer_id);
            }
        });

        self.sources.borrow_mut().push(MergeSource {
            producer_id: producer.core().id(),
            producer: Rc::downgrade(&producer),
            node: source,
            notified: Cell::new(false),
        });
    }

    fn source_completed(&self, source_id: NodeId, producer_id: NodeId) {
        let emptied = {
            let mut sources = self.sources.borrow_mut();
            let Some(source) = sources
                .iter()
                .find(|s| s.node.core().id() == source_id && s.producer_id == producer_id)
            else {
                return;
            };
            source.notified.set(true);

            let group_done = sources
                .iter()
                .filter(|s| s.producer_id == producer_id)
                .all(|s| s.notified.get());
            if group_done {
                let before = sources.len();
                sources.retain(|s| s.producer_id != producer_id);
                tracing::debug!(
                    merge = %self.core.id(),
                    producer = %producer_id,
                    removed = before - sources.len(),
                    remaining = sources.len(),
                    "merge source completed"
                );
            }
            sources.is_empty()
        };

        if emptied {
            self.complete_self();
        }
    }

    fn complete_self(&self) {
        if let Some(me) = self.producer.shared() {
            drain::complete(&me);
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.borrow().len()
    }
}

impl StreamNode for Merge {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn as_producer(&self) -> Option<Rc<dyn Producer>> {
        self.producer.shared()
    }

    fn wait(&self) -> bool {
        self.sources.borrow().iter().any(|s| s.node.wait())
    }

    fn cancel(&self) {
        let nodes: Vec<_> = self.sources.borrow().iter().map(|s| Rc::clone(&s.node)).collect();
        for node in nodes {
            node.cancel();
        }
        if let Some(me) = self.producer.shared() {
            drain::cancel(&me);
        }
    }
}

impl Producer for Merge {
    fn producer_core(&self) -> &ProducerCore {
        &self.producer
    }

    /// Complete every source; the merge follows once they have.
    fn complete(&self) {
        let producers: Vec<_> = self
            .sources
            .borrow()
            .iter()
            .filter_map(|s| s.producer.upgrade())
            .collect();
        if producers.is_empty() {
            self.complete_self();
            return;
        }
        for producer in producers {
            producer.complete();
        }
    }
}
