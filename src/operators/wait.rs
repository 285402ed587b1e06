// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Hold completion until an outside event fires.

use crate::engine::graph::{attach, forward_finished};
use crate::engine::NodeCore;
use crate::operators::subscribe_next;
use crate::scheduler::LoopHold;
use crate::traits::StreamNode;
use std::cell::Cell;
use std::future::Future;
use std::rc::{Rc, Weak};

/// Forwards values unchanged and reports busy until its [`Waiter`] fires.
pub struct WaitOp {
    core: NodeCore,
    waiting: Cell<bool>,
}

impl WaitOp {
    pub(crate) fn attach(parent: &Rc<dyn StreamNode>) -> (Rc<Self>, Waiter) {
        let node = attach(parent, "wait", |core| Self {
            core,
            waiting: Cell::new(true),
        });
        subscribe_next(parent, &node, |wait, value| wait.core.emit_next(value));
        let child: Rc<dyn StreamNode> = node.clone();
        forward_finished(parent, &child);

        let hold = parent.core().dispatcher().upgrade().map(|d| d.hold());
        let waiter = Waiter {
            node: Rc::downgrade(&node),
            hold: Cell::new(hold),
        };
        (node, waiter)
    }

    /// Attach a wait released when `event` resolves.
    pub(crate) fn attach_future(
        parent: &Rc<dyn StreamNode>,
        event: impl Future<Output = ()> + 'static,
    ) -> Rc<Self> {
        let (node, waiter) = Self::attach(parent);
        match parent.core().dispatcher().upgrade() {
            Some(dispatcher) => dispatcher.spawn_local(async move {
                event.await;
                waiter.release();
            }),
            None => waiter.release(),
        }
        node
    }

    fn unwait(&self) {
        if self.waiting.replace(false) {
            self.core.pulse_wait_over();
        }
    }
}

impl StreamNode for WaitOp {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn wait(&self) -> bool {
        self.waiting.get()
    }
}

/// One-shot release for a [`WaitOp`]. Keeps the event loop running until
/// released; dropping it releases too.
pub struct Waiter {
    node: Weak<WaitOp>,
    hold: Cell<Option<LoopHold>>,
}

impl Waiter {
    pub fn release(&self) {
        if let Some(node) = self.node.upgrade() {
            node.unwait();
        }
        self.hold.take();
    }

    pub fn is_released(&self) -> bool {
        self.node.upgrade().map_or(true, |node| !node.waiting.get())
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use crate::scheduler::{Dispatcher, Timer};
    use crate::Stream;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_completion_waits_for_release() {
        let dispatcher = Dispatcher::new();
        let completed_at = Rc::new(Cell::new(None));
        let started = Instant::now();

        let (stream, waiter) = Stream::range(&dispatcher, 0, 2, 1).wait_event();
        let slot = Rc::clone(&completed_at);
        stream.on_completed(move || slot.set(Some(started.elapsed())));

        let waiter = RefCell::new(Some(waiter));
        let timer = Timer::new(&dispatcher.downgrade(), move || {
            waiter.borrow_mut().take();
        });
        timer.start_once(Duration::from_millis(200));

        dispatcher.run().await;
        assert_eq!(completed_at.get(), Some(Duration::from_millis(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_releases_wait() {
        let dispatcher = Dispatcher::new();
        let done = Rc::new(Cell::new(false));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let flag = Rc::clone(&done);
        Stream::range(&dispatcher, 0, 1, 1)
            .wait_for(async move {
                let _ = rx.await;
            })
            .on_completed(move || flag.set(true));

        let sender = RefCell::new(Some(tx));
        let timer = Timer::new(&dispatcher.downgrade(), move || {
            if let Some(tx) = sender.borrow_mut().take() {
                let _ = tx.send(());
            }
        });
        timer.start_once(Duration::from_millis(20));

        dispatcher.run().await;
        assert!(done.get());
    }
}
