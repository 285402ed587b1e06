// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-thread event loop that every stream graph runs on.
//!
//! ## Contract
//!
//! - Jobs run in the order they were posted, one at a time. A job never runs
//!   inside another job, so signal delivery is never re-entrant.
//! - Due timers are collected once per pass, after the job queue has drained,
//!   and their firings are posted as ordinary jobs.
//! - [`Dispatcher::run`] returns when there are no jobs, no armed timers and no
//!   [`LoopHold`]s, or as soon as [`Dispatcher::shutdown`] is called.
//!
//! Cross-thread input (the async bridge) enters through [`Dispatcher::spawn_inbox`],
//! which pumps a tokio channel on the dispatcher's `LocalSet` and posts each
//! message as a job.
//!
//! A dispatcher is thread-affine. Worker threads build their own.

mod timer;

pub use timer::Timer;
pub(crate) use timer::TimerId;

use crate::config::EngineConfig;
use crate::observability::messages::scheduler::{LoopIdle, LoopShutdown, LoopStarted};
use crate::observability::messages::StructuredLog;
use crate::traits::{NodeId, StreamNode};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;
use timer::TimerWheel;
use tokio::sync::{mpsc, Notify};
use tokio::task::LocalSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

type Job = Box<dyn FnOnce()>;

struct Inner {
    config: Rc<EngineConfig>,
    queue: RefCell<VecDeque<Job>>,
    timers: RefCell<TimerWheel>,
    wake: Notify,
    tasks: LocalSet,
    holds: Cell<usize>,
    shutdown: CancellationToken,
    live: RefCell<HashMap<NodeId, Rc<dyn StreamNode>>>,
    jobs_run: Cell<u64>,
}

/// Handle to the event loop of the current thread. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Rc<Inner>,
}

/// Non-owning handle held by graph nodes, so the dispatcher's registry of
/// live roots never forms a cycle with the nodes it retains.
#[derive(Clone, Default)]
pub struct WeakDispatcher {
    inner: Weak<Inner>,
}

impl WeakDispatcher {
    pub fn upgrade(&self) -> Option<Dispatcher> {
        self.inner.upgrade().map(|inner| Dispatcher { inner })
    }

    /// Post a job if the dispatcher is still alive.
    pub fn post(&self, job: impl FnOnce() + 'static) -> bool {
        match self.upgrade() {
            Some(dispatcher) => {
                dispatcher.post(job);
                true
            }
            None => false,
        }
    }
}

/// Keeps [`Dispatcher::run`] from returning while held.
pub struct LoopHold {
    dispatcher: WeakDispatcher,
}

impl Drop for LoopHold {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            let holds = &dispatcher.inner.holds;
            holds.set(holds.get().saturating_sub(1));
            dispatcher.inner.wake.notify_one();
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                config: Rc::new(config),
                queue: RefCell::new(VecDeque::new()),
                timers: RefCell::new(TimerWheel::default()),
                wake: Notify::new(),
                tasks: LocalSet::new(),
                holds: Cell::new(0),
                shutdown: CancellationToken::new(),
                live: RefCell::new(HashMap::new()),
                jobs_run: Cell::new(0),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakDispatcher {
        WeakDispatcher {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> Rc<EngineConfig> {
        Rc::clone(&self.inner.config)
    }

    /// Append a job to the queue.
    pub fn post(&self, job: impl FnOnce() + 'static) {
        self.inner.queue.borrow_mut().push_back(Box::new(job));
        self.inner.wake.notify_one();
    }

    pub fn hold(&self) -> LoopHold {
        self.inner.holds.set(self.inner.holds.get() + 1);
        LoopHold {
            dispatcher: self.downgrade(),
        }
    }

    /// Stop the loop at the next job boundary. Pending jobs are discarded.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Pump `receiver` on this thread, posting every message to `on_message`
    /// and finally `on_close` once all senders are gone.
    pub fn spawn_inbox<M: 'static>(
        &self,
        mut receiver: mpsc::UnboundedReceiver<M>,
        on_message: impl Fn(M) + 'static,
        on_close: impl FnOnce() + 'static,
    ) {
        let weak = self.downgrade();
        let on_message: Rc<dyn Fn(M)> = Rc::new(on_message);
        self.inner.tasks.spawn_local(async move {
            while let Some(message) = receiver.recv().await {
                let handler = Rc::clone(&on_message);
                if !weak.post(move || handler(message)) {
                    return;
                }
            }
            weak.post(on_close);
        });
    }

    /// Run `future` on this thread's task set. The loop does not wait for
    /// it unless a [`LoopHold`] is held alongside.
    pub fn spawn_local(&self, future: impl Future<Output = ()> + 'static) {
        self.inner.tasks.spawn_local(future);
    }

    /// Keep `root` alive until [`Dispatcher::release`] is called for it.
    pub fn retain(&self, root: Rc<dyn StreamNode>) {
        let id = root.core().id();
        self.inner.live.borrow_mut().insert(id, root);
    }

    pub fn release(&self, id: NodeId) {
        let released = self.inner.live.borrow_mut().remove(&id);
        drop(released);
    }

    pub fn live_roots(&self) -> usize {
        self.inner.live.borrow().len()
    }

    pub(crate) fn schedule_timer(
        &self,
        deadline: Instant,
        period: Option<Duration>,
        fire: Rc<dyn Fn()>,
    ) -> TimerId {
        let id = self.inner.timers.borrow_mut().schedule(deadline, period, fire);
        self.inner.wake.notify_one();
        id
    }

    pub(crate) fn cancel_timer(&self, id: TimerId) {
        self.inner.timers.borrow_mut().cancel(id);
    }

    /// Drive jobs and timers until idle or shut down.
    pub async fn run(&self) {
        let started = LoopStarted {
            queued_jobs: self.inner.queue.borrow().len(),
            armed_timers: self.inner.timers.borrow().len(),
        };
        started.log();

        let inner = Rc::clone(&self.inner);
        self.inner
            .tasks
            .run_until(drive(inner).instrument(started.span("run")))
            .await;
    }
}

async fn drive(inner: Rc<Inner>) {
    loop {
        inner.run_queued();

        if inner.shutdown.is_cancelled() {
            // Dropping a job may drop nodes, which post their own jobs.
            let discarded = std::mem::take(&mut *inner.queue.borrow_mut());
            LoopShutdown {
                jobs_run: inner.jobs_run.get(),
                pending_jobs: discarded.len(),
            }
            .log();
            drop(discarded);
            return;
        }

        if inner.fire_due_timers() > 0 {
            // Let inbox pumps run between timer passes.
            tokio::task::yield_now().await;
            continue;
        }

        let next_deadline = inner.timers.borrow_mut().next_deadline();
        if next_deadline.is_none() && inner.holds.get() == 0 && inner.queue.borrow().is_empty() {
            LoopIdle {
                jobs_run: inner.jobs_run.get(),
                live_roots: inner.live.borrow().len(),
            }
            .log();
            return;
        }

        tokio::select! {
            _ = inner.shutdown.cancelled() => {}
            _ = inner.wake.notified() => {}
            _ = sleep_until(next_deadline) => {}
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl Inner {
    fn run_queued(&self) {
        while !self.shutdown.is_cancelled() {
            let job = self.queue.borrow_mut().pop_front();
            match job {
                Some(job) => {
                    job();
                    self.jobs_run.set(self.jobs_run.get() + 1);
                }
                None => return,
            }
        }
    }

    fn fire_due_timers(&self) -> usize {
        let due = self.timers.borrow_mut().take_due(Instant::now());
        let count = due.len();
        let mut queue = self.queue.borrow_mut();
        for fire in due {
            queue.push_back(Box::new(move || fire()));
        }
        count
    }
}
