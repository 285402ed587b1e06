// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Queued signal lines.
//!
//! Emitting never calls a subscriber directly: every subscriber gets its own
//! job on the dispatcher, so delivery happens after the emitting call returns
//! and in emission order per subscriber.
//!
//! A *tracked* subscription names the node that receives the value. That
//! node's in-flight count is raised when the job is posted and lowered after
//! the handler ran; this is how the completion drain sees values that are
//! queued but not yet delivered.

use crate::scheduler::WeakDispatcher;
use crate::traits::StreamNode;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(u64);

struct Slot<T> {
    id: SlotId,
    once: bool,
    receiver: Option<Weak<dyn StreamNode>>,
    handler: Rc<dyn Fn(T)>,
}

pub struct Signal<T> {
    slots: RefCell<Vec<Slot<T>>>,
    next_id: Cell<u64>,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn connect(&self, handler: impl Fn(T) + 'static) -> SlotId {
        self.add(false, None, Rc::new(handler))
    }

    /// Subscribe for the next emission only.
    pub fn connect_once(&self, handler: impl Fn(T) + 'static) -> SlotId {
        self.add(true, None, Rc::new(handler))
    }

    pub fn connect_tracked(
        &self,
        receiver: Weak<dyn StreamNode>,
        handler: impl Fn(T) + 'static,
    ) -> SlotId {
        self.add(false, Some(receiver), Rc::new(handler))
    }

    pub fn disconnect(&self, id: SlotId) {
        self.slots.borrow_mut().retain(|slot| slot.id != id);
    }

    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.slots.borrow_mut());
        drop(dropped);
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    pub fn emit(&self, dispatcher: &WeakDispatcher, value: T) {
        let Some(dispatcher) = dispatcher.upgrade() else {
            return;
        };

        let targets: Vec<(Option<Weak<dyn StreamNode>>, Rc<dyn Fn(T)>)> = {
            let mut slots = self.slots.borrow_mut();
            let targets = slots
                .iter()
                .map(|slot| (slot.receiver.clone(), Rc::clone(&slot.handler)))
                .collect();
            slots.retain(|slot| !slot.once);
            targets
        };

        for (receiver, handler) in targets {
            let value = value.clone();
            match receiver {
                None => dispatcher.post(move || handler(value)),
                Some(receiver) => {
                    let Some(node) = receiver.upgrade() else {
                        continue;
                    };
                    node.core().begin_delivery();
                    dispatcher.post(move || {
                        let Some(node) = receiver.upgrade() else {
                            return;
                        };
                        if !node.core().is_halted() {
                            handler(value);
                        }
                        node.core().end_delivery(&*node);
                    });
                }
            }
        }
    }

    fn add(&self, once: bool, receiver: Option<Weak<dyn StreamNode>>, handler: Rc<dyn Fn(T)>) -> SlotId {
        let id = SlotId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.slots.borrow_mut().push(Slot {
            id,
            once,
            receiver,
            handler,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Dispatcher;

    #[tokio::test]
    async fn test_emit_is_queued_not_direct() {
        let dispatcher = Dispatcher::new();
        let signal: Signal<i32> = Signal::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        signal.connect(move |v| sink.borrow_mut().push(v));
        signal.emit(&dispatcher.downgrade(), 1);
        signal.emit(&dispatcher.downgrade(), 2);
        assert!(seen.borrow().is_empty());

        dispatcher.run().await;
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_once_slot_is_removed_on_emit() {
        let dispatcher = Dispatcher::new();
        let signal: Signal<()> = Signal::default();
        let hits = Rc::new(Cell::new(0));

        let counter = Rc::clone(&hits);
        signal.connect_once(move |_| counter.set(counter.get() + 1));
        assert_eq!(signal.len(), 1);

        signal.emit(&dispatcher.downgrade(), ());
        signal.emit(&dispatcher.downgrade(), ());
        assert!(signal.is_empty());

        dispatcher.run().await;
        assert_eq!(hits.get(), 1);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let dispatcher = Dispatcher::new();
        let signal: Signal<()> = Signal::default();
        let hits = Rc::new(Cell::new(0));

        let counter = Rc::clone(&hits);
        let id = signal.connect(move |_| counter.set(counter.get() + 1));
        signal.disconnect(id);
        signal.emit(&dispatcher.downgrade(), ());

        dispatcher.run().await;
        assert_eq!(hits.get(), 0);
    }
}
