// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::sources::pull::{Pull, Pulled};
use crate::value::Value;
use std::cell::RefCell;

/// At most one value.
pub struct SingleLogic {
    value: RefCell<Option<Value>>,
}

impl SingleLogic {
    pub fn new(value: Option<Value>) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }
}

impl Pull for SingleLogic {
    const KIND: &'static str = "value";

    fn has_data(&self) -> bool {
        self.value.borrow().is_some()
    }

    fn pull(&self) -> Pulled {
        match self.value.borrow_mut().take() {
            Some(value) => Pulled::Value(value),
            None => Pulled::Exhausted,
        }
    }

    fn clear(&self) {
        self.value.borrow_mut().take();
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
    async fn test_single_value_then_complete() {
        let dispatcher = Dispatcher::new();
        let count = Rc::new(Cell::new(0));
        let last = Rc::new(RefCell::new(None));

        let counter = Rc::clone(&count);
        let slot = Rc::clone(&last);
        Stream::single(&dispatcher, Some(Value::from("only")))
            .each(move |_| counter.set(counter.get() + 1))
            .on_completed_last(move |v| *slot.borrow_mut() = v);

        dispatcher.run().await;
        assert_eq!(count.get(), 1);
        assert_eq!(*last.borrow(), Some(Value::from("only")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_completes_immediately() {
        let dispatcher = Dispatcher::new();
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);
        Stream::single(&dispatcher, None).on_completed(move || flag.set(true));

        dispatcher.run().await;
        assert!(done.get());
    }
}
