// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A producer hosted on a worker thread, seen through a proxy root on the
//! origin thread.
//!
//! The hosted graph is built on the worker by a `Send` factory. Requests,
//! defers, cancels and completes travel to the worker as commands; values,
//! errors, `waitOver` and `completed` come back as events in emission order.
//! The proxy counts as busy until the worker thread has exited and been
//! joined.

use crate::bridge::messages::{BridgeCommand, BridgeEvent, Outbox};
use crate::bridge::worker::{CommandInbox, WorkerThread};
use crate::engine::{drain, NodeCore, ProducerCore, Stream};
use crate::errors::BridgeError;
use crate::scheduler::{Dispatcher, LoopHold};
use crate::traits::{Producer, Request, StreamNode};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tokio::sync::mpsc;

pub struct AsyncProducer {
    core: NodeCore,
    producer: ProducerCore,
    worker: RefCell<Option<WorkerThread>>,
    running: Cell<bool>,
    hold: RefCell<Option<LoopHold>>,
}

impl AsyncProducer {
    pub(crate) fn spawn<F>(dispatcher: &Dispatcher, factory: F) -> Result<Rc<Self>, BridgeError>
    where
        F: FnOnce(&Dispatcher) -> Stream + Send + 'static,
    {
        let config = dispatcher.config();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let worker = WorkerThread::spawn(&config, "hosted producer", events_tx, move |d, commands, events| {
            host(d, factory, commands, events)
        })?;

        let initial = Request::Every(config.scheduler.default_request());
        let weak_dispatcher = dispatcher.downgrade();
        let proxy = Rc::new_cyclic(|weak: &Weak<Self>| {
            let node: Weak<dyn StreamNode> = weak.clone();
            let producer: Weak<dyn Producer> = weak.clone();
            let core = NodeCore::new("async_producer", weak_dispatcher, node);
            Self {
                producer: ProducerCore::new(core.id(), producer, initial),
                core,
                worker: RefCell::new(Some(worker)),
                running: Cell::new(true),
                hold: RefCell::new(Some(dispatcher.hold())),
            }
        });

        let on_event = Rc::downgrade(&proxy);
        let on_close = Rc::downgrade(&proxy);
        dispatcher.spawn_inbox(
            events_rx,
            move |event| {
                if let Some(proxy) = on_event.upgrade() {
                    proxy.on_event(event);
                }
            },
            move || {
                if let Some(proxy) = on_close.upgrade() {
                    proxy.exited();
                }
            },
        );

        // A proxy cancelled from this side takes the hosted graph with it.
        let weak = Rc::downgrade(&proxy);
        proxy.producer.completed.connect(move |_| {
            if let Some(proxy) = weak.upgrade() {
                if proxy.running.get() {
                    proxy.send(BridgeCommand::Cancel);
                }
            }
        });

        dispatcher.retain(proxy.clone());
        Ok(proxy)
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    fn send(&self, command: BridgeCommand) {
        if let Some(worker) = self.worker.borrow().as_ref() {
            worker.send(command);
        }
    }

    fn on_event(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::Next(value) => self.core.emit_next(value),
            BridgeEvent::WaitOver => self.core.pulse_wait_over(),
            BridgeEvent::Completed => {
                if let Some(me) = self.producer.shared() {
                    drain::complete(&me);
                }
            }
            BridgeEvent::Error(error) => drain::raise(self, error),
            BridgeEvent::Exited => self.exited(),
            BridgeEvent::Ready => {}
        }
    }

    fn exited(&self) {
        if !self.running.replace(false) {
            return;
        }
        let worker = self.worker.borrow_mut().take();
        drop(worker);
        self.hold.borrow_mut().take();
        self.core.pulse_wait_over();
    }
}

impl StreamNode for AsyncProducer {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn as_producer(&self) -> Option<Rc<dyn Producer>> {
        self.producer.shared()
    }

    fn wait(&self) -> bool {
        self.running.get()
    }

    fn cancel(&self) {
        self.send(BridgeCommand::Cancel);
        if let Some(me) = self.producer.shared() {
            drain::cancel(&me);
        }
    }
}

impl Producer for AsyncProducer {
    fn producer_core(&self) -> &ProducerCore {
        &self.producer
    }

    fn request(&self, request: Request) {
        self.producer.remember(request);
        self.send(BridgeCommand::Request(request));
    }

    fn defer(&self) {
        self.producer.remember(Request::Defer);
        self.send(BridgeCommand::Defer);
    }

    fn complete(&self) {
        self.send(BridgeCommand::Complete);
        if let Some(me) = self.producer.shared() {
            drain::complete(&me);
        }
    }
}

/// Worker side: build the hosted graph and wire it to the bridge.
fn host<F>(dispatcher: &Dispatcher, factory: F, commands: CommandInbox, events: Outbox<BridgeEvent>)
where
    F: FnOnce(&Dispatcher) -> Stream,
{
    let hold = Rc::new(RefCell::new(Some(dispatcher.hold())));
    let stream = factory(dispatcher);
    let Some(root) = stream.root() else {
        tracing::warn!(kind = stream.kind(), "hosted stream has no producer");
        events.send(BridgeEvent::Completed);
        return;
    };

    let out = events.clone();
    stream.node().core().next.connect(move |value| {
        out.send(BridgeEvent::Next(value));
    });
    let out = events.clone();
    root.core().wait_over.connect(move |()| {
        out.send(BridgeEvent::WaitOver);
    });
    let out = events.clone();
    root.core().error.connect(move |error| {
        out.send(BridgeEvent::Error(error));
    });
    let release = Rc::clone(&hold);
    root.producer_core().completed.connect(move |_| {
        events.send(BridgeEvent::Completed);
        release.borrow_mut().take();
    });

    let target = Rc::downgrade(&root);
    let worker = dispatcher.clone();
    dispatcher.spawn_inbox(
        commands,
        move |command| {
            let Some(root) = target.upgrade() else {
                return;
            };
            match command {
                BridgeCommand::Request(request) => root.request(request),
                BridgeCommand::Defer => root.defer(),
                BridgeCommand::Cancel => root.cancel(),
                BridgeCommand::Complete => root.complete(),
                other => tracing::debug!(?other, "command not used by a hosted producer"),
            }
        },
        move || {
            hold.borrow_mut().take();
            worker.shutdown();
        },
    );
}
