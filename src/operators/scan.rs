// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Accumulate every value and emit the accumulator once, when the parent
//! finishes.

use crate::engine::graph::attach;
use crate::engine::NodeCore;
use crate::operators::{subscribe_finished, subscribe_next};
use crate::traits::{NodeId, StreamNode};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub struct Scan {
    core: NodeCore,
    pending: Cell<bool>,
    step: Box<dyn Fn(&Value)>,
    snapshot: Box<dyn Fn() -> Value>,
}

impl Scan {
    pub(crate) fn attach<S, F>(parent: &Rc<dyn StreamNode>, initial: S, step: F) -> Rc<Self>
    where
        S: Clone + Into<Value> + 'static,
        F: FnMut(&mut S, &Value) + 'static,
    {
        let acc = Rc::new(RefCell::new(initial));
        let step = RefCell::new(step);

        let for_step = Rc::clone(&acc);
        let node = attach(parent, "scan", |core| Self {
            core,
            pending: Cell::new(false),
            step: Box::new(move |value| (&mut *step.borrow_mut())(&mut *for_step.borrow_mut(), value)),
            snapshot: Box::new(move || acc.borrow().clone().into()),
        });

        subscribe_next(parent, &node, |scan, value| {
            scan.pending.set(true);
            (scan.step)(&value);
        });
        subscribe_finished(parent, &node, |scan, origin| scan.on_finished(origin));
        node
    }

    fn on_finished(&self, origin: NodeId) {
        if self.pending.replace(false) {
            self.core.emit_next((self.snapshot)());
            self.core.pulse_wait_over();
        }
        self.core.emit_finished(origin);
    }
}

impl StreamNode for Scan {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn wait(&self) -> bool {
        self.pending.get()
    }

    fn cancel(&self) {
        self.pending.set(false);
    }
}
