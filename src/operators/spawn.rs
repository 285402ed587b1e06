// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run a nested stream per value and hold the outer producer until it is done.
//!
//! For every value the outer producer is deferred, the nested stream is built
//! and its producer is tracked as a child of the outer one, so errors route
//! outward and the outer drain waits for it. Once the nested producer
//! completes it is untracked again and the outer producer resumes with its
//! last request.

use crate::engine::graph::track_child;
use crate::engine::Stream;
use crate::operators::{relay, Relay};
use crate::traits::StreamNode;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) fn wait_complete(
    parent: &Rc<dyn StreamNode>,
    build: impl FnMut(&Value) -> Stream + 'static,
) -> Rc<Relay> {
    let build = RefCell::new(build);
    relay(parent, "wait_complete", move |node, value| {
        let Some(outer) = node.producer() else {
            node.core().emit_next(value);
            return;
        };
        outer.defer();

        let inner = (&mut *build.borrow_mut())(&value);
        match inner.node().root() {
            Some(inner_root) => {
                let outer_node: Rc<dyn StreamNode> = outer.clone();
                let inner_node: Rc<dyn StreamNode> = inner_root.clone();
                track_child(&outer_node, &inner_node);

                let weak = Rc::downgrade(&outer);
                inner_root.producer_core().completed.connect_once(move |inner_id| {
                    if let Some(outer) = weak.upgrade() {
                        outer.core().remove_child(inner_id);
                        outer.request_again();
                    }
                });
            }
            None => outer.request_again(),
        }
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
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_outer_completes_after_nested_streams() {
        let dispatcher = Dispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let done = Rc::new(Cell::new(false));

        let d = dispatcher.clone();
        let inner_log = Rc::clone(&log);
        let outer_log = Rc::clone(&log);
        let flag = Rc::clone(&done);
        Stream::from_values(&dispatcher, vec![1, 2])
            .wait_complete(move |v| {
                let sink = Rc::clone(&inner_log);
                let tag = v.as_i64().unwrap_or_default();
                Stream::range(&d, 0, 2, 1)
                    .delay(Duration::from_millis(10))
                    .each(move |i| sink.borrow_mut().push(format!("inner{}:{}", tag, i)))
            })
            .each(move |v| outer_log.borrow_mut().push(format!("outer:{}", v)))
            .on_completed(move || flag.set(true));

        dispatcher.run().await;
        assert!(done.get());
        assert_eq!(
            *log.borrow(),
            vec!["outer:1", "inner1:0", "inner1:1", "outer:2", "inner2:0", "inner2:1"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_nested_error_reaches_outer_handler() {
        let dispatcher = Dispatcher::new();
        let codes = Rc::new(RefCell::new(Vec::new()));

        let d = dispatcher.clone();
        let sink = Rc::clone(&codes);
        Stream::from_values(&dispatcher, vec![Value::from("x")])
            .wait_complete(move |_| {
                Stream::single(&d, Some(Value::None)).with_handle(|v, s| {
                    s.raise_error(crate::errors::StreamError::new("nested", 42, false));
                    v.clone()
                })
            })
            .on_error(move |e| sink.borrow_mut().push(e.code));

        dispatcher.run().await;
        assert_eq!(*codes.borrow(), vec![42]);
    }
}
