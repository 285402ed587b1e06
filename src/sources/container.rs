// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::sources::pull::{Pull, PullSource, Pulled};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Weak;

/// Emits the items of a collection in order; more may be appended later.
pub struct ContainerLogic {
    items: RefCell<VecDeque<Value>>,
}

impl ContainerLogic {
    pub fn new(items: impl IntoIterator<Item = Value>) -> Self {
        Self {
            items: RefCell::new(items.into_iter().collect()),
        }
    }

    pub fn append(&self, items: impl IntoIterator<Item = Value>) {
        self.items.borrow_mut().extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl Pull for ContainerLogic {
    const KIND: &'static str = "container";

    fn has_data(&self) -> bool {
        !self.items.borrow().is_empty()
    }

    fn pull(&self) -> Pulled {
        match self.items.borrow_mut().pop_front() {
            Some(value) => Pulled::Value(value),
            None => Pulled::Exhausted,
        }
    }

    fn clear(&self) {
        self.items.borrow_mut().clear();
    }
}

/// Appends to a running container source.
#[derive(Clone)]
pub struct Container {
    source: Weak<PullSource<ContainerLogic>>,
}

impl Container {
    pub(crate) fn new(source: Weak<PullSource<ContainerLogic>>) -> Self {
        Self { source }
    }

    /// Queue more items. Ignored once the source is gone.
    pub fn append<V: Into<Value>>(&self, items: impl IntoIterator<Item = V>) {
        if let Some(source) = self.source.upgrade() {
            source.logic().append(items.into_iter().map(Into::<Value>::into));
            source.data_added();
        }
    }
}
