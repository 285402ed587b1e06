// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::sources::pull::{Pull, PullSource, Pulled};
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Weak;

/// An open-ended source fed through a [`Queue`] handle. It stays alive while
/// empty and completes once closed and drained. An open queue never keeps an
/// ancestor's drain waiting.
#[derive(Default)]
pub struct QueueLogic {
    items: RefCell<VecDeque<Value>>,
    closed: Cell<bool>,
}

impl QueueLogic {
    fn push(&self, value: Value) {
        if self.closed.get() {
            tracing::debug!(value = %value, "push after close dropped");
            return;
        }
        self.items.borrow_mut().push_back(value);
    }

    fn close(&self) {
        self.closed.set(true);
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl Pull for QueueLogic {
    const KIND: &'static str = "queue";

    fn has_data(&self) -> bool {
        !self.closed.get() || !self.items.borrow().is_empty()
    }

    fn holds_work(&self) -> bool {
        false
    }

    fn pull(&self) -> Pulled {
        match self.items.borrow_mut().pop_front() {
            Some(value) => Pulled::Value(value),
            None if self.closed.get() => Pulled::Exhausted,
            None => Pulled::Pending,
        }
    }

    fn clear(&self) {
        self.items.borrow_mut().clear();
        self.closed.set(true);
    }
}

/// Producer side of a queue source.
#[derive(Clone)]
pub struct Queue {
    source: Weak<PullSource<QueueLogic>>,
}

impl Queue {
    pub(crate) fn new(source: Weak<PullSource<QueueLogic>>) -> Self {
        Self { source }
    }

    pub fn push(&self, value: impl Into<Value>) {
        if let Some(source) = self.source.upgrade() {
            source.logic().push(value.into());
            source.data_added();
        }
    }

    /// No more values; the source completes after the queued ones.
    pub fn complete(&self) {
        if let Some(source) = self.source.upgrade() {
            source.logic().close();
            source.data_added();
        }
    }

    pub fn is_open(&self) -> bool {
        self.source
            .upgrade()
            .is_some_and(|source| !source.logic().is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Dispatcher, Timer};
    use crate::Stream;
    use std::rc::Rc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_idle_queue_resumes_on_push() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let done = Rc::new(Cell::new(false));

        let (stream, queue) = Stream::queue(&dispatcher);
        let sink = Rc::clone(&seen);
        let flag = Rc::clone(&done);
        stream
            .each(move |v| sink.borrow_mut().push(v.as_i64().unwrap()))
            .on_completed(move || flag.set(true));

        queue.push(1);
        let later = queue.clone();
        let timer = Timer::new(&dispatcher.downgrade(), move || {
            later.push(2);
            later.complete();
        });
        timer.start_once(Duration::from_millis(50));

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert!(done.get());
        assert!(!queue.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_after_close_is_dropped() {
        let dispatcher = Dispatcher::new();
        let count = Rc::new(Cell::new(0));

        let (stream, queue) = Stream::queue(&dispatcher);
        let counter = Rc::clone(&count);
        stream.each(move |_| counter.set(counter.get() + 1));
        queue.push("a");
        queue.complete();
        queue.push("b");

        dispatcher.run().await;
        assert_eq!(count.get(), 1);
    }
}
