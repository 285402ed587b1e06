// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::sources::pull::{Pull, Pulled};
use crate::value::Value;
use std::cell::Cell;

/// Integers from `begin` towards `end` (exclusive) by `step`.
///
/// A negative step counts down. A zero step yields nothing.
pub struct RangeLogic {
    next: Cell<i64>,
    end: i64,
    step: i64,
}

impl RangeLogic {
    pub fn new(begin: i64, end: i64, step: i64) -> Self {
        if step == 0 {
            tracing::warn!(begin, end, "range with zero step is empty");
        }
        Self {
            next: Cell::new(begin),
            end,
            step,
        }
    }
}

impl Pull for RangeLogic {
    const KIND: &'static str = "range";

    fn has_data(&self) -> bool {
        let next = self.next.get();
        (self.step > 0 && next < self.end) || (self.step < 0 && next > self.end)
    }

    fn pull(&self) -> Pulled {
        if !self.has_data() {
            return Pulled::Exhausted;
        }
        let value = self.next.get();
        self.next.set(value.saturating_add(self.step));
        Pulled::Value(Value::Int(value))
    }

    fn clear(&self) {
        self.next.set(self.end);
    }
}
