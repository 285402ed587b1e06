// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Batch values into lists of at most `capacity` items.

use crate::engine::graph::attach;
use crate::engine::NodeCore;
use crate::operators::{subscribe_finished, subscribe_next};
use crate::traits::StreamNode;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub struct Buffer {
    core: NodeCore,
    capacity: usize,
    batch: RefCell<Vec<Value>>,
}

impl Buffer {
    pub(crate) fn attach(parent: &Rc<dyn StreamNode>, capacity: usize) -> Rc<Self> {
        let capacity = capacity.max(1);
        let node = attach(parent, "buffer", |core| Self {
            core,
            capacity,
            batch: RefCell::new(Vec::with_capacity(capacity.min(64))),
        });

        subscribe_next(parent, &node, |buffer, value| buffer.push(value));
        subscribe_finished(parent, &node, |buffer, origin| {
            buffer.flush();
            buffer.core.emit_finished(origin);
        });
        node
    }

    fn push(&self, value: Value) {
        let full = {
            let mut batch = self.batch.borrow_mut();
            batch.push(value);
            batch.len() >= self.capacity
        };
        if full {
            self.flush();
        }
    }

    fn flush(&self) {
        let batch = std::mem::take(&mut *self.batch.borrow_mut());
        if batch.is_empty() {
            return;
        }
        tracing::trace!(node = %self.core.id(), items = batch.len(), "buffer flush");
        self.core.emit_next(Value::List(batch));
        self.core.pulse_wait_over();
    }
}

impl StreamNode for Buffer {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn wait(&self) -> bool {
        !self.batch.borrow().is_empty()
    }

    fn cancel(&self) {
        self.batch.borrow_mut().clear();
    }
}
