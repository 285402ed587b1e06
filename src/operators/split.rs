// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pair every parent value with the output of a branch built on the same
//! parent.
//!
//! Pairing is round-synchronised: the n-th parent value is paired with the
//! n-th branch value and emitted as a two-element list. Without a branch the
//! second element is `None`.

use crate::engine::graph::attach;
use crate::engine::{NodeCore, Stream};
use crate::operators::{subscribe_finished, subscribe_next, FinishGate};
use crate::traits::StreamNode;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

pub struct Split {
    core: NodeCore,
    parent_values: RefCell<VecDeque<Value>>,
    branch_values: RefCell<VecDeque<Value>>,
    branch: RefCell<Option<Weak<dyn StreamNode>>>,
    gate: FinishGate,
}

impl Split {
    pub(crate) fn attach(
        parent: &Rc<dyn StreamNode>,
        build: impl FnOnce(Stream) -> Stream,
    ) -> Rc<Self> {
        let node = attach(parent, "split", |core| Self {
            core,
            parent_values: RefCell::new(VecDeque::new()),
            branch_values: RefCell::new(VecDeque::new()),
            branch: RefCell::new(None),
            gate: FinishGate::default(),
        });

        subscribe_next(parent, &node, |split, value| {
            split.parent_values.borrow_mut().push_back(value);
            split.try_emit();
        });

        let branch = build(Stream::from_node(Rc::clone(parent)));
        if branch.id() != parent.core().id() {
            subscribe_next(branch.node(), &node, |split, value| {
                split.branch_values.borrow_mut().push_back(value);
                split.try_emit();
            });
            *node.branch.borrow_mut() = Some(Rc::downgrade(branch.node()));
        }

        subscribe_finished(parent, &node, |split, origin| {
            split.gate.arrive(&split.core, origin, !split.wait());
        });
        node
    }

    fn has_branch(&self) -> bool {
        self.branch.borrow().is_some()
    }

    fn try_emit(&self) {
        tracing::trace!(
            node = %self.core.id(),
            parent = self.parent_values.borrow().len(),
            branch = self.branch_values.borrow().len(),
            "split round"
        );

        loop {
            let pair = if self.has_branch() {
                let mut parents = self.parent_values.borrow_mut();
                let mut branches = self.branch_values.borrow_mut();
                if parents.is_empty() || branches.is_empty() {
                    None
                } else {
                    parents.pop_front().zip(branches.pop_front())
                }
            } else {
                self.parent_values
                    .borrow_mut()
                    .pop_front()
                    .map(|value| (value, Value::None))
            };
            let Some((first, second)) = pair else {
                break;
            };
            self.core.emit_next(Value::List(vec![first, second]));
        }

        if !self.wait() {
            self.gate.release(&self.core);
        }
    }
}

impl StreamNode for Split {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn wait(&self) -> bool {
        !self.parent_values.borrow().is_empty() || !self.branch_values.borrow().is_empty()
    }

    fn cancel(&self) {
        self.parent_values.borrow_mut().clear();
        self.branch_values.borrow_mut().clear();
        let branch = self.branch.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(branch) = branch {
            branch.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::scheduler::{Dispatcher, Timer};
    use crate::value::Value;
    use crate::Stream;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn pair(v: &Value) -> (Value, Value) {
        let items = v.as_list().unwrap();
        (items[0].clone(), items[1].clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairs_with_slow_branch() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        Stream::from_values(&dispatcher, vec![1, 2])
            .split(|s| {
                s.map(|v| Value::Int(v.as_i64().unwrap() + 100))
                    .delay(Duration::from_millis(30))
            })
            .each(move |v| sink.borrow_mut().push(pair(v)));

        dispatcher.run().await;
        assert_eq!(
            *seen.borrow(),
            vec![
                (Value::Int(1), Value::Int(101)),
                (Value::Int(2), Value::Int(102)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_branch_pairs_with_none() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        Stream::from_values(&dispatcher, vec!["a"])
            .split(|s| s)
            .each(move |v| sink.borrow_mut().push(pair(v)));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec![(Value::from("a"), Value::None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_cascades_to_branch() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let branch = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&branch);
        let split = Stream::from_values(&dispatcher, vec![1, 2, 3]).split(move |s| {
            let delayed = s.delay(Duration::from_millis(100));
            *slot.borrow_mut() = Some(delayed.clone());
            delayed
        });
        let sink = Rc::clone(&seen);
        split.each(move |v| sink.borrow_mut().push(pair(v)));

        let node = Rc::clone(split.node());
        let timer = Timer::new(&dispatcher.downgrade(), move || node.cancel());
        timer.start_once(Duration::from_millis(10));

        dispatcher.run().await;
        let branch = branch.borrow_mut().take().unwrap();
        assert!(!branch.node().wait());
        assert!(!split.node().wait());
        assert!(seen.borrow().is_empty());
    }
}
