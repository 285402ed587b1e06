// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stateless per-value operators.

use crate::operators::{relay, Relay};
use crate::traits::StreamNode;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) fn map(
    parent: &Rc<dyn StreamNode>,
    f: impl FnMut(&Value) -> Value + 'static,
) -> Rc<Relay> {
    let f = RefCell::new(f);
    relay(parent, "map", move |node, value| {
        let mapped = (&mut *f.borrow_mut())(&value);
        node.core().emit_next(mapped);
    })
}

pub(crate) fn filter(
    parent: &Rc<dyn StreamNode>,
    predicate: impl FnMut(&Value) -> bool + 'static,
) -> Rc<Relay> {
    let predicate = RefCell::new(predicate);
    relay(parent, "filter", move |node, value| {
        if (&mut *predicate.borrow_mut())(&value) {
            node.core().emit_next(value);
        }
    })
}

pub(crate) fn each(parent: &Rc<dyn StreamNode>, f: impl FnMut(&Value) + 'static) -> Rc<Relay> {
    let f = RefCell::new(f);
    relay(parent, "each", move |node, value| {
        (&mut *f.borrow_mut())(&value);
        node.core().emit_next(value);
    })
}

/// Completes the producer instead of forwarding when `predicate` holds.
pub(crate) fn complete_when(
    parent: &Rc<dyn StreamNode>,
    predicate: impl FnMut(&Value) -> bool + 'static,
) -> Rc<Relay> {
    let predicate = RefCell::new(predicate);
    relay(parent, "complete_filter", move |node, value| {
        if !(&mut *predicate.borrow_mut())(&value) {
            node.core().emit_next(value);
            return;
        }
        match node.producer() {
            Some(producer) => producer.complete(),
            None => tracing::warn!(node = %node.core().id(), "complete requested on a detached node"),
        }
    })
}

/// Remembers the latest value in `slot` and forwards it.
pub(crate) fn last_value(
    parent: &Rc<dyn StreamNode>,
    slot: Rc<RefCell<Option<Value>>>,
) -> Rc<Relay> {
    relay(parent, "last", move |node, value| {
        *slot.borrow_mut() = Some(value.clone());
        node.core().emit_next(value);
    })
}

#[cfg(test)]
mod tests {
    use crate::scheduler::Dispatcher;
    use crate::value::Value;
    use crate::Stream;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[tokio::test(start_paused = true)]
    async fn test_map_filter_each_chain() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        Stream::range(&dispatcher, 0, 10, 1)
            .filter(|v| v.as_i64().is_some_and(|i| i % 3 == 0))
            .map(|v| Value::from(format!("#{}", v)))
            .each(move |v| sink.borrow_mut().push(v.to_string()));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec!["#0", "#3", "#6", "#9"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_when_stops_early() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let completions = Rc::new(Cell::new(0));

        let sink = Rc::clone(&seen);
        let counter = Rc::clone(&completions);
        Stream::range(&dispatcher, 0, 1000, 1)
            .complete_when(|v| v.as_i64() == Some(3))
            .each(move |v| sink.borrow_mut().push(v.as_i64().unwrap()))
            .on_completed(move || counter.set(counter.get() + 1));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(completions.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_each_forwards_nothing() {
        let dispatcher = Dispatcher::new();
        let count = Rc::new(Cell::new(0));
        let done = Rc::new(Cell::new(false));

        let counter = Rc::clone(&count);
        let flag = Rc::clone(&done);
        Stream::range(&dispatcher, 0, 5, 1)
            .complete_each()
            .each(move |_| counter.set(counter.get() + 1))
            .on_completed(move || flag.set(true));

        dispatcher.run().await;
        assert_eq!(count.get(), 0);
        assert!(done.get());
    }
}
