// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Operators that hand the callback something besides the value.

use crate::engine::Stream;
use crate::operators::{relay, Relay};
use crate::traits::StreamNode;
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Passes the running index, starting at 0, alongside each value.
pub(crate) fn with_index(
    parent: &Rc<dyn StreamNode>,
    f: impl FnMut(usize, &Value) -> Value + 'static,
) -> Rc<Relay> {
    let f = RefCell::new(f);
    let index = Cell::new(0usize);
    relay(parent, "index", move |node, value| {
        let current = index.get();
        index.set(current + 1);
        let mapped = (&mut *f.borrow_mut())(current, &value);
        node.core().emit_next(mapped);
    })
}

/// Passes a handle to the operator's own stream alongside each value.
pub(crate) fn with_handle(
    parent: &Rc<dyn StreamNode>,
    f: impl FnMut(&Value, &Stream) -> Value + 'static,
) -> Rc<Relay> {
    let f = RefCell::new(f);
    relay(parent, "info", move |node, value| {
        let Some(shared) = node.core().shared() else {
            return;
        };
        let handle = Stream::from_node(shared);
        let mapped = (&mut *f.borrow_mut())(&value, &handle);
        node.core().emit_next(mapped);
    })
}

#[cfg(test)]
mod tests {
    use crate::scheduler::Dispatcher;
    use crate::value::Value;
    use crate::Stream;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[tokio::test(start_paused = true)]
    async fn test_index_counts_from_zero() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        Stream::from_values(&dispatcher, vec!["a", "b"])
            .with_index(|i, v| Value::from(format!("{}:{}", i, v)))
            .each(move |v| sink.borrow_mut().push(v.to_string()));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec!["0:a", "1:b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_can_complete_its_stream() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        Stream::range(&dispatcher, 0, 100, 1)
            .with_handle(|v, stream| {
                if v.as_i64() == Some(1) {
                    stream.complete();
                }
                v.clone()
            })
            .each(move |v| sink.borrow_mut().push(v.as_i64().unwrap()));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }
}
