// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Expand collection values into one emission per element, one element per
//! tick. Maps expand to `[key, value]` pairs; scalars pass through as a
//! single element.

use crate::engine::graph::attach;
use crate::engine::NodeCore;
use crate::operators::{subscribe_finished, subscribe_next, FinishGate};
use crate::scheduler::Timer;
use crate::traits::StreamNode;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

type Expand = Box<dyn FnMut(&Value) -> Value>;

pub struct Iterate {
    core: NodeCore,
    pending: RefCell<VecDeque<Value>>,
    expand: RefCell<Option<Expand>>,
    timer: Timer,
    gate: FinishGate,
}

impl Iterate {
    pub(crate) fn attach(parent: &Rc<dyn StreamNode>, expand: Option<Expand>) -> Rc<Self> {
        let dispatcher = parent.core().dispatcher().clone();
        let node = attach(parent, "iterate", |core| Self {
            core,
            pending: RefCell::new(VecDeque::new()),
            expand: RefCell::new(expand),
            timer: Timer::new(&dispatcher, || {}),
            gate: FinishGate::default(),
        });

        let weak: Weak<Self> = Rc::downgrade(&node);
        node.timer.set_callback(move || {
            if let Some(iterate) = weak.upgrade() {
                iterate.tick();
            }
        });

        subscribe_next(parent, &node, |iterate, value| iterate.push(value));
        subscribe_finished(parent, &node, |iterate, origin| {
            iterate.gate.arrive(&iterate.core, origin, !iterate.wait());
        });
        node
    }

    fn push(&self, value: Value) {
        let value = match self.expand.borrow_mut().as_mut() {
            Some(expand) => expand(&value),
            None => value,
        };
        let elements = match value {
            Value::List(_) | Value::Map(_) => value.into_elements(),
            scalar => vec![scalar],
        };
        if elements.is_empty() {
            return;
        }
        self.pending.borrow_mut().extend(elements);
        if !self.timer.is_active() {
            self.timer.start(Duration::ZERO);
        }
    }

    fn tick(&self) {
        let next = self.pending.borrow_mut().pop_front();
        if let Some(value) = next {
            self.core.emit_next(value);
        }
        if self.pending.borrow().is_empty() {
            self.timer.stop();
            self.core.pulse_wait_over();
            self.gate.release(&self.core);
        }
    }
}

impl StreamNode for Iterate {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn wait(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    fn cancel(&self) {
        self.timer.stop();
        self.pending.borrow_mut().clear();
        self.core.pulse_wait_over();
    }
}

#[cfg(test)]
mod tests {
    use crate::scheduler::Dispatcher;
    use crate::value::Value;
    use crate::Stream;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[tokio::test(start_paused = true)]
    async fn test_lists_are_flattened_in_order() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        Stream::from_values(
            &dispatcher,
            vec![Value::from(vec![1, 2]), Value::from(3), Value::from(vec![4])],
        )
        .iterate()
        .each(move |v| sink.borrow_mut().push(v.as_i64().unwrap()));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_iterate_with_expands_computed_value() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        Stream::from_values(&dispatcher, vec!["a,b"])
            .iterate_with(|v| {
                Value::from(
                    v.as_str()
                        .unwrap_or_default()
                        .split(',')
                        .map(String::from)
                        .collect::<Vec<_>>(),
                )
            })
            .each(move |v| sink.borrow_mut().push(v.to_string()));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }
}
