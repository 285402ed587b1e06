// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Timers driven by the dispatcher loop.
//!
//! The [`TimerWheel`] is the dispatcher's private deadline heap. Entries with
//! equal deadlines fire in the order they were scheduled, which keeps virtual
//! time tests deterministic. Nodes never touch the wheel directly; they own a
//! [`Timer`], which re-arms, stops and discards stale firings on their behalf.

use crate::scheduler::WeakDispatcher;
use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TimerId(u64);

struct Entry {
    seq: u64,
    period: Option<Duration>,
    fire: Rc<dyn Fn()>,
}

#[derive(Default)]
pub(crate) struct TimerWheel {
    entries: HashMap<TimerId, Entry>,
    heap: BinaryHeap<Reverse<(Instant, u64, TimerId)>>,
    next_seq: u64,
    next_id: u64,
}

impl TimerWheel {
    pub(crate) fn schedule(
        &mut self,
        deadline: Instant,
        period: Option<Duration>,
        fire: Rc<dyn Fn()>,
    ) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let seq = self.push(deadline, id);
        self.entries.insert(id, Entry { seq, period, fire });
        id
    }

    pub(crate) fn cancel(&mut self, id: TimerId) {
        self.entries.remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse((deadline, seq, id))) = self.heap.peek().copied() {
            if self.is_current(id, seq) {
                return Some(deadline);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop every entry due at `now`, in deadline order. Repeating entries are
    /// re-armed after the whole batch is collected, so a zero period fires
    /// once per call rather than spinning.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<Rc<dyn Fn()>> {
        let mut fired = Vec::new();
        let mut rearm = Vec::new();

        while let Some(Reverse((deadline, seq, id))) = self.heap.peek().copied() {
            if deadline > now {
                break;
            }
            self.heap.pop();
            if !self.is_current(id, seq) {
                continue;
            }

            let period = self.entries.get(&id).and_then(|e| e.period);
            match period {
                Some(period) => {
                    if let Some(entry) = self.entries.get(&id) {
                        fired.push(Rc::clone(&entry.fire));
                    }
                    rearm.push((id, (deadline + period).max(now)));
                }
                None => {
                    if let Some(entry) = self.entries.remove(&id) {
                        fired.push(entry.fire);
                    }
                }
            }
        }

        for (id, deadline) in rearm {
            let seq = self.push(deadline, id);
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.seq = seq;
            }
        }

        fired
    }

    fn push(&mut self, deadline: Instant, id: TimerId) -> u64 {
        self.next_seq += 1;
        self.heap.push(Reverse((deadline, self.next_seq, id)));
        self.next_seq
    }

    fn is_current(&self, id: TimerId, seq: u64) -> bool {
        self.entries.get(&id).is_some_and(|e| e.seq == seq)
    }
}

struct TimerState {
    dispatcher: WeakDispatcher,
    callback: RefCell<Rc<dyn Fn()>>,
    generation: Cell<u64>,
    active: Cell<bool>,
    id: Cell<Option<TimerId>>,
}

/// A restartable timer owned by a node.
///
/// Stopping a timer also discards a firing that was already queued but not
/// yet run. Dropping the timer stops it.
pub struct Timer {
    state: Rc<TimerState>,
}

impl Timer {
    pub fn new(dispatcher: &WeakDispatcher, callback: impl Fn() + 'static) -> Self {
        Self {
            state: Rc::new(TimerState {
                dispatcher: dispatcher.clone(),
                callback: RefCell::new(Rc::new(callback)),
                generation: Cell::new(0),
                active: Cell::new(false),
                id: Cell::new(None),
            }),
        }
    }

    pub fn set_callback(&self, callback: impl Fn() + 'static) {
        *self.state.callback.borrow_mut() = Rc::new(callback);
    }

    /// Fire every `interval` until stopped.
    pub fn start(&self, interval: Duration) {
        let deadline = Instant::now() + interval;
        self.arm(deadline, Some(interval));
    }

    /// Fire once after `interval`.
    pub fn start_once(&self, interval: Duration) {
        self.arm(Instant::now() + interval, None);
    }

    /// Fire once at `deadline`.
    pub fn start_at(&self, deadline: Instant) {
        self.arm(deadline, None);
    }

    pub fn stop(&self) {
        let state = &self.state;
        state.generation.set(state.generation.get() + 1);
        state.active.set(false);
        if let Some(id) = state.id.take() {
            if let Some(dispatcher) = state.dispatcher.upgrade() {
                dispatcher.cancel_timer(id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.active.get()
    }

    fn arm(&self, deadline: Instant, period: Option<Duration>) {
        self.stop();
        let Some(dispatcher) = self.state.dispatcher.upgrade() else {
            return;
        };

        let generation = self.state.generation.get();
        let weak: Weak<TimerState> = Rc::downgrade(&self.state);
        let fire: Rc<dyn Fn()> = Rc::new(move || {
            let Some(state) = weak.upgrade() else {
                return;
            };
            if state.generation.get() != generation {
                return;
            }
            if period.is_none() {
                state.active.set(false);
                state.id.set(None);
            }
            let callback = Rc::clone(&state.callback.borrow());
            callback();
        });

        self.state.active.set(true);
        self.state
            .id
            .set(Some(dispatcher.schedule_timer(deadline, period, fire)));
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Dispatcher;

    fn noop() -> Rc<dyn Fn()> {
        Rc::new(|| {})
    }

    #[test]
    fn test_equal_deadlines_fire_in_schedule_order() {
        let mut wheel = TimerWheel::default();
        let now = Instant::now();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = Rc::clone(&order);
            wheel.schedule(now, None, Rc::new(move || order.borrow_mut().push(i)));
        }

        for fire in wheel.take_due(now) {
            fire();
        }
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(wheel.len(), 0);
    }

    #[test]
    fn test_cancelled_entry_is_skipped() {
        let mut wheel = TimerWheel::default();
        let now = Instant::now();
        let id = wheel.schedule(now, None, noop());
        wheel.schedule(now + Duration::from_millis(5), None, noop());

        wheel.cancel(id);
        assert_eq!(wheel.take_due(now).len(), 0);
        assert_eq!(wheel.next_deadline(), Some(now + Duration::from_millis(5)));
    }

    #[test]
    fn test_zero_period_fires_once_per_pass() {
        let mut wheel = TimerWheel::default();
        let now = Instant::now();
        wheel.schedule(now, Some(Duration::ZERO), noop());

        assert_eq!(wheel.take_due(now).len(), 1);
        assert_eq!(wheel.take_due(now).len(), 1);
        assert_eq!(wheel.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_queued_firing() {
        let dispatcher = Dispatcher::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let timer = Rc::new(Timer::new(&dispatcher.downgrade(), move || {
            counter.set(counter.get() + 1)
        }));

        let stopper = Rc::clone(&timer);
        let t2 = Timer::new(&dispatcher.downgrade(), move || stopper.stop());
        t2.start_once(Duration::from_millis(10));

        // Same deadline, scheduled after t2: both firings are queued in one
        // pass and t2's runs first.
        timer.start_once(Duration::from_millis(10));
        assert!(timer.is_active());

        dispatcher.run().await;
        assert_eq!(hits.get(), 0);
        assert!(!timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_timer_runs_until_stopped() {
        let dispatcher = Dispatcher::new();
        let hits = Rc::new(Cell::new(0));
        let timer: Rc<RefCell<Option<Timer>>> = Rc::new(RefCell::new(None));

        let counter = Rc::clone(&hits);
        let slot = Rc::clone(&timer);
        *timer.borrow_mut() = Some(Timer::new(&dispatcher.downgrade(), move || {
            counter.set(counter.get() + 1);
            if counter.get() == 4 {
                if let Some(t) = slot.borrow().as_ref() {
                    t.stop();
                }
            }
        }));
        if let Some(t) = timer.borrow().as_ref() {
            t.start(Duration::from_millis(100));
        }

        let started = Instant::now();
        dispatcher.run().await;
        assert_eq!(hits.get(), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(400));
        timer.borrow_mut().take();
    }
}
