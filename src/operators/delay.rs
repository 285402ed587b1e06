// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Re-emit every value after a fixed interval.
//!
//! Deadlines are staggered by the configured minimum gap so that values
//! arriving in the same instant keep their order. Timers are pooled: a fired
//! timer is reused for the next value.

use crate::engine::graph::attach;
use crate::engine::NodeCore;
use crate::operators::{subscribe_finished, subscribe_next, FinishGate};
use crate::scheduler::Timer;
use crate::traits::StreamNode;
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

pub struct Delay {
    core: NodeCore,
    interval: Duration,
    stagger: Duration,
    pool: RefCell<Vec<Timer>>,
    outstanding: Cell<usize>,
    last_deadline: Cell<Option<Instant>>,
    gate: FinishGate,
}

impl Delay {
    pub(crate) fn attach(parent: &Rc<dyn StreamNode>, interval: Duration) -> Rc<Self> {
        let stagger = parent
            .core()
            .dispatcher()
            .upgrade()
            .map(|d| d.config().scheduler.delay_stagger())
            .unwrap_or_default();

        let node = attach(parent, "delay", |core| Self {
            core,
            interval,
            stagger,
            pool: RefCell::new(Vec::new()),
            outstanding: Cell::new(0),
            last_deadline: Cell::new(None),
            gate: FinishGate::default(),
        });

        subscribe_next(parent, &node, |delay, value| delay.schedule(value));
        subscribe_finished(parent, &node, |delay, origin| {
            delay
                .gate
                .arrive(&delay.core, origin, delay.outstanding.get() == 0);
        });
        node
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    fn schedule(self: &Rc<Self>, value: Value) {
        self.outstanding.set(self.outstanding.get() + 1);

        let mut deadline = Instant::now() + self.interval;
        if let Some(last) = self.last_deadline.get() {
            deadline = deadline.max(last + self.stagger);
        }
        self.last_deadline.set(Some(deadline));

        let weak = Rc::downgrade(self);
        let fire = move || {
            if let Some(delay) = weak.upgrade() {
                delay.fire(value.clone());
            }
        };

        let mut pool = self.pool.borrow_mut();
        match pool.iter().find(|timer| !timer.is_active()) {
            Some(timer) => {
                timer.set_callback(fire);
                timer.start_at(deadline);
            }
            None => {
                let timer = Timer::new(self.core.dispatcher(), fire);
                timer.start_at(deadline);
                pool.push(timer);
            }
        }
    }

    fn fire(&self, value: Value) {
        let remaining = self.outstanding.get().saturating_sub(1);
        self.outstanding.set(remaining);
        self.core.emit_next(value);
        if remaining == 0 {
            self.core.pulse_wait_over();
            self.gate.release(&self.core);
        }
    }
}

impl StreamNode for Delay {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn wait(&self) -> bool {
        self.outstanding.get() > 0
    }

    fn cancel(&self) {
        for timer in self.pool.borrow().iter() {
            timer.stop();
        }
        self.outstanding.set(0);
        self.core.pulse_wait_over();
    }
}

#[cfg(test)]
mod tests {
    use crate::scheduler::Dispatcher;
    use crate::Stream;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_values_keep_order_and_are_staggered() {
        let dispatcher = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let started = Instant::now();

        let sink = Rc::clone(&seen);
        Stream::from_values(&dispatcher, vec![1, 2, 3])
            .delay(Duration::from_millis(100))
            .each(move |v| sink.borrow_mut().push((v.as_i64().unwrap(), started.elapsed())));

        dispatcher.run().await;
        let seen = seen.borrow();
        assert_eq!(seen.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(seen.iter().all(|(_, at)| *at >= Duration::from_millis(100)));
        assert!(seen.windows(2).all(|w| w[0].1 < w[1].1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_reuses_fired_timers() {
        let dispatcher = Dispatcher::new();
        let (stream, queue) = Stream::queue(&dispatcher);
        let delay = super::Delay::attach(stream.node(), Duration::from_millis(10));

        queue.push(1);
        let later = queue.clone();
        let timer = crate::scheduler::Timer::new(&dispatcher.downgrade(), move || {
            later.push(2);
            later.complete();
        });
        timer.start_once(Duration::from_millis(50));

        dispatcher.run().await;
        assert_eq!(delay.pool.borrow().len(), 1);
        assert_eq!(delay.outstanding(), 0);
    }
}
