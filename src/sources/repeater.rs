// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::sources::pull::{Pull, Pulled};
use crate::value::Value;
use std::cell::{Cell, RefCell};

/// Calls a function on every tick, forever. Never keeps a drain waiting.
pub struct RepeaterLogic {
    generator: RefCell<Box<dyn FnMut() -> Value>>,
    stopped: Cell<bool>,
}

impl RepeaterLogic {
    pub fn new(generator: impl FnMut() -> Value + 'static) -> Self {
        Self {
            generator: RefCell::new(Box::new(generator)),
            stopped: Cell::new(false),
        }
    }
}

impl Pull for RepeaterLogic {
    const KIND: &'static str = "repeater";

    fn has_data(&self) -> bool {
        !self.stopped.get()
    }

    fn holds_work(&self) -> bool {
        false
    }

    fn pull(&self) -> Pulled {
        if self.stopped.get() {
            return Pulled::Exhausted;
        }
        match self.generator.try_borrow_mut() {
            Ok(mut generator) => Pulled::Value(generator()),
            Err(_) => Pulled::Pending,
        }
    }

    fn clear(&self) {
        self.stopped.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Dispatcher;
    use crate::Stream;
    use std::rc::Rc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_completed() {
        let dispatcher = Dispatcher::new();
        let ticks = Rc::new(Cell::new(0));
        let done = Rc::new(Cell::new(false));

        let counter = Rc::new(Cell::new(0));
        let stream = Stream::repeater(&dispatcher, Duration::from_millis(10), move || {
            counter.set(counter.get() + 1);
            Value::Int(counter.get())
        });
        let handle = stream.clone();
        let seen = Rc::clone(&ticks);
        let flag = Rc::clone(&done);
        stream
            .each(move |v| {
                seen.set(seen.get() + 1);
                if v.as_i64() == Some(5) {
                    handle.complete();
                }
            })
            .on_completed(move || flag.set(true));

        dispatcher.run().await;
        assert_eq!(ticks.get(), 5);
        assert!(done.get());
    }
}
