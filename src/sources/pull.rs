// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Timer-driven producers that emit one value per tick.
//!
//! A [`PullSource`] owns a single timer. Every tick asks its [`Pull`] logic
//! whether data is left: if so one value is pulled and emitted, otherwise the
//! source completes. `Request::One` stops the timer and pulls once right
//! away, `Request::Every` restarts the timer at that interval and a defer
//! stops it without completing.
//!
//! Shortly after construction the source starts itself with the configured
//! default interval, unless it was deferred or explicitly requested first.
//! A source that starts without data completes.

use crate::engine::{drain, NodeCore, ProducerCore, ProducerState};
use crate::scheduler::{Dispatcher, Timer};
use crate::traits::{Producer, Request, StreamNode};
use crate::value::Value;
use std::rc::{Rc, Weak};

/// What one pull produced.
pub enum Pulled {
    Value(Value),
    Exhausted,
    /// Nothing available yet. The timer parks until data is added or the
    /// source is requested again.
    Pending,
}

/// The data side of a [`PullSource`].
pub trait Pull: 'static {
    const KIND: &'static str;

    fn has_data(&self) -> bool;

    fn pull(&self) -> Pulled;

    /// Whether this source keeps an ancestor's drain waiting.
    fn holds_work(&self) -> bool {
        self.has_data()
    }

    /// Drop any remaining data. Called on cancel.
    fn clear(&self);

    /// Called on every non-defer request before data is checked.
    fn rearm(&self) {}
}

pub struct PullSource<L: Pull> {
    core: NodeCore,
    producer: ProducerCore,
    timer: Timer,
    logic: L,
}

impl<L: Pull> PullSource<L> {
    pub(crate) fn spawn(dispatcher: &Dispatcher, logic: L) -> Rc<Self> {
        let initial = Request::Every(dispatcher.config().scheduler.default_request());
        Self::spawn_with(dispatcher, logic, initial)
    }

    pub(crate) fn spawn_with(dispatcher: &Dispatcher, logic: L, initial: Request) -> Rc<Self> {
        let weak_dispatcher = dispatcher.downgrade();

        let source = Rc::new_cyclic(|weak: &Weak<Self>| {
            let node: Weak<dyn StreamNode> = weak.clone();
            let producer: Weak<dyn Producer> = weak.clone();
            let core = NodeCore::new(L::KIND, weak_dispatcher.clone(), node);

            let target = weak.clone();
            let timer = Timer::new(&weak_dispatcher, move || {
                if let Some(source) = target.upgrade() {
                    source.tick();
                }
            });

            Self {
                producer: ProducerCore::new(core.id(), producer, initial),
                core,
                timer,
                logic,
            }
        });

        dispatcher.retain(source.clone());
        let weak = Rc::downgrade(&source);
        dispatcher.post(move || {
            if let Some(source) = weak.upgrade() {
                source.start();
            }
        });
        source
    }

    pub fn logic(&self) -> &L {
        &self.logic
    }

    /// Restart the timer after data was added, unless deferred or stopped.
    pub fn data_added(&self) {
        if self.producer.state() != ProducerState::Requesting || self.timer.is_active() {
            return;
        }
        if let Request::Every(interval) = self.producer.last_request() {
            self.timer.start(interval);
        }
    }

    fn start(&self) {
        if self.producer.state() != ProducerState::Idle {
            return;
        }
        self.request(self.producer.last_request());
    }

    fn tick(&self) {
        if self.producer.is_terminal() {
            self.timer.stop();
            return;
        }
        if self.logic.has_data() {
            self.on_next();
        } else {
            self.complete();
        }
    }

    fn on_next(&self) {
        match self.logic.pull() {
            Pulled::Value(value) => self.core.emit_next(value),
            Pulled::Exhausted => self.complete(),
            Pulled::Pending => self.timer.stop(),
        }
    }

    /// Remember `request` and rearm. Completes instead when no data is left.
    fn prepare(&self, request: Request) -> bool {
        self.producer.remember(request);
        self.logic.rearm();
        if !self.logic.has_data() {
            self.complete();
            return false;
        }
        true
    }

    fn accepts_requests(&self) -> bool {
        !self.producer.is_terminal() && self.producer.state() != ProducerState::Completing
    }
}

impl<L: Pull> StreamNode for PullSource<L> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn as_producer(&self) -> Option<Rc<dyn Producer>> {
        self.producer.shared()
    }

    fn wait(&self) -> bool {
        !self.producer.is_terminal() && self.logic.holds_work()
    }

    fn cancel(&self) {
        self.logic.clear();
        self.timer.stop();
        if let Some(me) = self.producer.shared() {
            drain::cancel(&me);
        }
    }
}

impl<L: Pull> Producer for PullSource<L> {
    fn producer_core(&self) -> &ProducerCore {
        &self.producer
    }

    fn request(&self, request: Request) {
        if !self.accepts_requests() {
            return;
        }
        match request {
            Request::Defer => self.defer(),
            Request::One => {
                if self.prepare(request) {
                    self.timer.stop();
                    self.on_next();
                }
            }
            Request::Every(interval) => {
                if self.prepare(request) {
                    self.timer.start(interval);
                }
            }
        }
    }

    fn defer(&self) {
        self.timer.stop();
        self.producer.remember(Request::Defer);
    }

    fn complete(&self) {
        self.timer.stop();
        if let Some(me) = self.producer.shared() {
            drain::complete(&me);
        }
    }
}
