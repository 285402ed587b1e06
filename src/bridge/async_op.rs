// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run a branch of operators on a worker thread.
//!
//! On the worker the branch hangs off a queue-fed inlet. Parent values are
//! pushed into the inlet and the branch's output comes back as this node's
//! values. The parent producer is deferred until the worker reports ready.
//!
//! When the parent finishes the inlet is closed. Its completion drain checks
//! every branch node in turn and waits on the first busy one, so the worker
//! exits only once the whole branch is idle. This node holds the parent's
//! `finished` until then.

use crate::bridge::messages::{BridgeCommand, BridgeEvent, Outbox};
use crate::bridge::worker::{CommandInbox, WorkerThread};
use crate::engine::graph::attach;
use crate::engine::{drain, NodeCore, Stream};
use crate::errors::BridgeError;
use crate::operators::{subscribe_finished, subscribe_next, FinishGate};
use crate::scheduler::{Dispatcher, LoopHold};
use crate::traits::StreamNode;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tokio::sync::mpsc;

pub struct AsyncWatcher {
    core: NodeCore,
    worker: RefCell<Option<WorkerThread>>,
    running: Cell<bool>,
    hold: RefCell<Option<LoopHold>>,
    gate: FinishGate,
}

impl AsyncWatcher {
    pub(crate) fn attach<F>(parent: &Rc<dyn StreamNode>, build: F) -> Result<Rc<Self>, BridgeError>
    where
        F: FnOnce(Stream) -> Stream + Send + 'static,
    {
        let dispatcher = parent
            .core()
            .dispatcher()
            .upgrade()
            .ok_or(BridgeError::Detached)?;
        let upstream = parent.producer().ok_or(BridgeError::Detached)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let worker = WorkerThread::spawn(
            &dispatcher.config(),
            "async operator",
            events_tx,
            move |d, commands, events| host_branch(d, build, commands, events),
        )?;
        upstream.defer();

        let node = attach(parent, "async", |core| Self {
            core,
            worker: RefCell::new(Some(worker)),
            running: Cell::new(true),
            hold: RefCell::new(Some(dispatcher.hold())),
            gate: FinishGate::default(),
        });

        subscribe_next(parent, &node, |watcher, value| {
            watcher.send(BridgeCommand::Push(value));
        });
        subscribe_finished(parent, &node, |watcher, origin| {
            watcher.send(BridgeCommand::Finish);
            watcher
                .gate
                .arrive(&watcher.core, origin, !watcher.running.get());
        });

        let on_event = Rc::downgrade(&node);
        let on_close = Rc::downgrade(&node);
        dispatcher.spawn_inbox(
            events_rx,
            move |event| {
                if let Some(watcher) = on_event.upgrade() {
                    watcher.on_event(event);
                }
            },
            move || {
                if let Some(watcher) = on_close.upgrade() {
                    watcher.exited();
                }
            },
        );
        Ok(node)
    }

    fn send(&self, command: BridgeCommand) {
        if let Some(worker) = self.worker.borrow().as_ref() {
            worker.send(command);
        }
    }

    fn on_event(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::Ready => {
                if let Some(upstream) = self.core.parent().and_then(|parent| parent.producer()) {
                    upstream.request_again();
                }
            }
            BridgeEvent::Next(value) => self.core.emit_next(value),
            BridgeEvent::Error(error) => drain::raise(self, error),
            BridgeEvent::Exited => self.exited(),
            BridgeEvent::WaitOver | BridgeEvent::Completed => {}
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
        self.gate.release(&self.core);
    }
}

impl StreamNode for AsyncWatcher {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn wait(&self) -> bool {
        self.running.get()
    }

    fn cancel(&self) {
        self.send(BridgeCommand::Cancel);
    }
}

/// Worker side: inlet, branch and outlet.
fn host_branch<F>(dispatcher: &Dispatcher, build: F, commands: CommandInbox, events: Outbox<BridgeEvent>)
where
    F: FnOnce(Stream) -> Stream,
{
    let hold = Rc::new(RefCell::new(Some(dispatcher.hold())));
    let (inlet, queue) = Stream::queue(dispatcher);
    let outlet = build(inlet.clone());

    let out = events.clone();
    outlet.node().core().next.connect(move |value| {
        out.send(BridgeEvent::Next(value));
    });

    let inlet_root = inlet.root();
    let target = inlet_root.as_ref().map(Rc::downgrade);
    if let Some(root) = inlet_root {
        let out = events.clone();
        root.core().error.connect(move |error| {
            out.send(BridgeEvent::Error(error));
        });
        let out = events.clone();
        let release = Rc::clone(&hold);
        root.producer_core().completed.connect(move |_| {
            out.send(BridgeEvent::Completed);
            release.borrow_mut().take();
        });
    }

    let worker = dispatcher.clone();
    dispatcher.spawn_inbox(
        commands,
        move |command| match command {
            BridgeCommand::Push(value) => queue.push(value),
            BridgeCommand::Finish | BridgeCommand::Complete => queue.complete(),
            BridgeCommand::Cancel => {
                if let Some(root) = target.as_ref().and_then(Weak::upgrade) {
                    root.cancel();
                }
            }
            other => tracing::debug!(?other, "command not used by an async branch"),
        },
        move || {
            hold.borrow_mut().take();
            worker.shutdown();
        },
    );

    events.send(BridgeEvent::Ready);
}
