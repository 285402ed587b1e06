// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::sources::pull::{Pull, Pulled};
use crate::value::Value;
use std::cell::{Cell, RefCell};

type Generator = Box<dyn FnMut() -> Option<Value>>;

/// Calls a function at most once per request. `None` ends the stream.
pub struct FuncLogic {
    generator: RefCell<Option<Generator>>,
    called: Cell<bool>,
}

impl FuncLogic {
    pub fn new(generator: impl FnMut() -> Option<Value> + 'static) -> Self {
        Self {
            generator: RefCell::new(Some(Box::new(generator))),
            called: Cell::new(false),
        }
    }
}

impl Pull for FuncLogic {
    const KIND: &'static str = "func";

    fn has_data(&self) -> bool {
        !self.called.get()
            && self
                .generator
                .try_borrow()
                .map_or(true, |generator| generator.is_some())
    }

    fn pull(&self) -> Pulled {
        let Ok(mut generator) = self.generator.try_borrow_mut() else {
            return Pulled::Pending;
        };
        let Some(generator) = generator.as_mut() else {
            return Pulled::Exhausted;
        };
        self.called.set(true);
        match generator() {
            Some(value) => Pulled::Value(value),
            None => Pulled::Exhausted,
        }
    }

    fn clear(&self) {
        if let Ok(mut generator) = self.generator.try_borrow_mut() {
            generator.take();
        }
        self.called.set(true);
    }

    fn rearm(&self) {
        self.called.set(false);
    }
}
