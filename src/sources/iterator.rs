// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::sources::pull::{Pull, Pulled};
use crate::value::Value;
use std::cell::RefCell;
use std::iter::Peekable;

type BoxedIter = Peekable<Box<dyn Iterator<Item = Value>>>;

/// Pulls from an external iterator. The optional end callback runs when the
/// source is dropped.
pub struct IteratorLogic {
    iter: RefCell<Option<BoxedIter>>,
    on_end: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl IteratorLogic {
    pub fn new(iter: Box<dyn Iterator<Item = Value>>, on_end: Option<Box<dyn FnOnce()>>) -> Self {
        Self {
            iter: RefCell::new(Some(iter.peekable())),
            on_end: RefCell::new(on_end),
        }
    }

    /// Adapt a `has_next`/`next` pair.
    pub fn from_fns(
        mut has_next: impl FnMut() -> bool + 'static,
        mut next: impl FnMut() -> Value + 'static,
        on_end: Option<Box<dyn FnOnce()>>,
    ) -> Self {
        let iter = std::iter::from_fn(move || has_next().then(&mut next));
        Self::new(Box::new(iter), on_end)
    }
}

impl Pull for IteratorLogic {
    const KIND: &'static str = "iterator";

    fn has_data(&self) -> bool {
        self.iter
            .borrow_mut()
            .as_mut()
            .is_some_and(|iter| iter.peek().is_some())
    }

    fn pull(&self) -> Pulled {
        match self.iter.borrow_mut().as_mut().and_then(Iterator::next) {
            Some(value) => Pulled::Value(value),
            None => Pulled::Exhausted,
        }
    }

    fn clear(&self) {
        self.iter.borrow_mut().take();
    }
}

impl Drop for IteratorLogic {
    fn drop(&mut self) {
        if let Some(on_end) = self.on_end.get_mut().take() {
            on_end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Dispatcher;
    use crate::Stream;
    use std::cell::Cell;
    use std::rc::Rc;

    #[tokio::test(start_paused = true)]
    async fn test_rust_iterator() {
        let dispatcher = Dispatcher::new();
        let total = Rc::new(Cell::new(0));

        let sum = Rc::clone(&total);
        Stream::from_iter(&dispatcher, (1..=4).map(|i| i * 10))
            .each(move |v| sum.set(sum.get() + v.as_i64().unwrap()));

        dispatcher.run().await;
        assert_eq!(total.get(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_pair_and_end_callback() {
        let dispatcher = Dispatcher::new();
        let cursor = Rc::new(Cell::new(0));
        let ended = Rc::new(Cell::new(false));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let cursor_view = Rc::clone(&cursor);
        let step = Rc::clone(&cursor);
        let flag = Rc::clone(&ended);
        let sink = Rc::clone(&seen);
        Stream::from_fns(
            &dispatcher,
            move || cursor_view.get() < 3,
            move || {
                step.set(step.get() + 1);
                Value::Int(step.get())
            },
            move || flag.set(true),
        )
        .each(move |v| sink.borrow_mut().push(v.as_i64().unwrap()));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
        assert!(ended.get());
    }
}
