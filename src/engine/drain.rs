// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Completion, cancellation and error routing for a rooted tree.
//!
//! ## Drain
//!
//! `complete` broadcasts `finished` once per completion cycle and then scans
//! every descendant. The first busy one wins: the drain parks on that node's
//! `waitOver` and runs again when it pulses. Only a scan that finds nothing
//! busy finishes the producer, so completion callbacks never observe values
//! still travelling through the subtree.
//!
//! ## Finishing
//!
//! Finishing is a single queued job: take and fire the completion callbacks in
//! FIFO order, broadcast `completed`, pulse `waitOver`, and let the dispatcher
//! drop a root it was keeping alive.
//!
//! ## Errors
//!
//! Errors travel to the root and are handed to the error handler of every
//! producer in the tree. After a fatal error the tree is halted and
//! cancelled, and later errors are dropped.

use crate::engine::graph::{descendants, is_busy};
use crate::engine::producer_core::ProducerState;
use crate::errors::StreamError;
use crate::observability::messages::engine::{
    DetachedNode, DrainDeferred, ErrorRouted, ProducerCancelled, ProducerCompleted,
    StreamCancelled,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Producer, StreamNode};
use std::rc::Rc;

pub fn complete(producer: &Rc<dyn Producer>) {
    let core = producer.producer_core();
    if core.is_terminal() {
        return;
    }
    if core.state() != ProducerState::Completing {
        core.set_state(ProducerState::Completing);
        producer.core().emit_finished(producer.core().id());
    }

    for descendant in descendants(producer.core()) {
        if is_busy(&*descendant) {
            let deferred = DrainDeferred {
                producer_id: producer.core().id().get(),
                busy_id: descendant.core().id().get(),
                busy_kind: descendant.core().kind(),
                in_flight: descendant.core().in_flight(),
            };
            deferred.log();

            let span = deferred.span("drain_retry");
            let weak = Rc::downgrade(producer);
            let slot = descendant.core().wait_over.connect_once(move |_| {
                let _entered = span.enter();
                if let Some(producer) = weak.upgrade() {
                    producer.complete();
                }
            });
            core.park_drain(&descendant, slot);
            return;
        }
    }

    core.unpark_drain();
    core.set_state(ProducerState::Completed);
    finish(producer);
}

/// Cancel every descendant and finish without draining.
pub fn cancel(producer: &Rc<dyn Producer>) {
    let core = producer.producer_core();
    if core.is_terminal() {
        return;
    }
    core.set_state(ProducerState::Cancelled);
    core.unpark_drain();

    let below = descendants(producer.core());
    ProducerCancelled {
        node_id: producer.core().id().get(),
        kind: producer.core().kind(),
        descendants: below.len(),
    }
    .log();

    for node in &below {
        node.cancel();
    }
    finish(producer);
}

fn finish(producer: &Rc<dyn Producer>) {
    let weak = Rc::downgrade(producer);
    producer.core().dispatcher().post(move || {
        let Some(producer) = weak.upgrade() else {
            return;
        };
        let callbacks = producer.producer_core().take_completions();
        ProducerCompleted {
            node_id: producer.core().id().get(),
            kind: producer.core().kind(),
            callbacks: callbacks.len(),
        }
        .log();
        for callback in callbacks {
            callback();
        }

        let id = producer.core().id();
        producer
            .producer_core()
            .completed
            .emit(producer.core().dispatcher(), id);
        producer.core().pulse_wait_over();
        if producer.producer_core().state() == ProducerState::Completed {
            detach_handlers(&producer);
        }

        if let Some(dispatcher) = producer.core().dispatcher().upgrade() {
            dispatcher.release(id);
        }
    });
}

/// Route `error` from `node` to its root. Delivery is queued.
pub fn raise(node: &dyn StreamNode, error: StreamError) {
    let Some(root) = node.root() else {
        DetachedNode {
            node_id: node.core().id().get(),
            kind: node.core().kind(),
            operation: "raise_error",
        }
        .log();
        return;
    };

    post_delivery(&root, error);
}

fn post_delivery(root: &Rc<dyn Producer>, error: StreamError) {
    let weak = Rc::downgrade(root);
    root.core().dispatcher().post(move || {
        if let Some(root) = weak.upgrade() {
            deliver(&root, error);
        }
    });
}

fn deliver(root: &Rc<dyn Producer>, error: StreamError) {
    let root_core = root.producer_core();
    if root_core.fatal_seen() {
        return;
    }
    if error.fatal {
        root_core.mark_fatal();
    }

    let mut handlers: Vec<_> = descendants(root.core())
        .iter()
        .filter_map(|node| node.as_producer())
        .filter_map(|producer| producer.producer_core().error_handler())
        .collect();
    handlers.extend(root_core.error_handler());

    ErrorRouted {
        root_id: root.core().id().get(),
        error: &error,
        handlers: handlers.len(),
    }
    .log();

    for handler in &handlers {
        handler(&error);
    }
    let fatal = error.fatal;
    root.core().error.emit(root.core().dispatcher(), error);

    if fatal {
        cancel_all(root);
        detach_handlers(root);
    }
}

/// Drop user closures held by a tree that can no longer emit, so handles
/// captured inside them do not keep the tree alive.
fn detach_handlers(root: &Rc<dyn Producer>) {
    for node in descendants(root.core()) {
        node.core().next.clear();
        if let Some(producer) = node.as_producer() {
            producer.producer_core().clear_error_handler();
        }
    }
    root.core().next.clear();
    root.producer_core().clear_error_handler();
}

/// Clear every completion callback in the tree, halt every node, cancel.
pub fn cancel_all(root: &Rc<dyn Producer>) {
    let below = descendants(root.core());
    for node in &below {
        if let Some(producer) = node.as_producer() {
            producer.producer_core().clear_completions();
        }
        node.core().halt();
    }
    root.producer_core().clear_completions();
    root.core().halt();

    StreamCancelled {
        root_id: root.core().id().get(),
        kind: root.core().kind(),
    }
    .log();
    cancel(root);
}

/// Imperative cancel: tear the tree down, then report the cancellation error.
pub fn do_cancel(node: &dyn StreamNode) {
    let Some(root) = node.root() else {
        DetachedNode {
            node_id: node.core().id().get(),
            kind: node.core().kind(),
            operation: "cancel",
        }
        .log();
        return;
    };
    cancel_all(&root);
    post_delivery(&root, StreamError::cancellation());
}
