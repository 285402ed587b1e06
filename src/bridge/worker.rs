// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A dedicated OS thread running its own current-thread runtime and
//! [`Dispatcher`].
//!
//! The thread sends [`BridgeEvent::Exited`] when its loop returns, also when
//! it unwinds. Dropping the handle closes the command channel, which shuts
//! the worker's loop down, and joins the thread.

use crate::bridge::messages::{BridgeCommand, BridgeEvent, Outbox};
use crate::config::EngineConfig;
use crate::errors::BridgeError;
use crate::observability::messages::bridge::{
    WorkerJoined, WorkerPanicked, WorkerRuntimeFailed, WorkerStarted,
};
use crate::observability::messages::StructuredLog;
use crate::scheduler::Dispatcher;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::Instrument;

pub(crate) type CommandInbox = mpsc::UnboundedReceiver<BridgeCommand>;

pub(crate) struct WorkerThread {
    name: Arc<str>,
    commands: Option<Outbox<BridgeCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Start the thread. `setup` runs on it with the worker's dispatcher
    /// before that dispatcher is driven.
    pub(crate) fn spawn<S>(
        config: &EngineConfig,
        role: &'static str,
        events: mpsc::UnboundedSender<BridgeEvent>,
        setup: S,
    ) -> Result<Self, BridgeError>
    where
        S: FnOnce(&Dispatcher, CommandInbox, Outbox<BridgeEvent>) + Send + 'static,
    {
        let name: Arc<str> = Arc::from(config.workers.thread_name.as_str());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let events = Outbox::new(Arc::clone(&name), events);

        let mut builder = std::thread::Builder::new().name(name.to_string());
        match config.workers.stack_size_kb.map(|kb| kb.checked_mul(1024)) {
            Some(Some(bytes)) => builder = builder.stack_size(bytes),
            Some(None) => tracing::warn!(
                worker = %name,
                stack_size_kb = ?config.workers.stack_size_kb,
                "worker stack size overflows, using the platform default"
            ),
            None => {}
        }

        let worker_config = config.clone();
        let worker_name = Arc::clone(&name);
        let handle = builder
            .spawn(move || run_worker(&worker_name, role, worker_config, command_rx, events, setup))
            .map_err(|source| BridgeError::Spawn {
                name: name.to_string(),
                source,
            })?;

        WorkerStarted { name: &name, role }.log();
        Ok(Self {
            commands: Some(Outbox::new(Arc::clone(&name), command_tx)),
            name,
            handle: Some(handle),
        })
    }

    pub(crate) fn send(&self, command: BridgeCommand) -> bool {
        self.commands
            .as_ref()
            .is_some_and(|commands| commands.send(command))
    }

    /// Close the command channel and wait for the thread.
    pub(crate) fn join(&mut self) {
        self.commands.take();
        let Some(handle) = self.handle.take() else {
            return;
        };
        match handle.join() {
            Ok(()) => WorkerJoined { name: &self.name }.log(),
            Err(_) => WorkerPanicked { name: &self.name }.log(),
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.join();
    }
}

struct ExitNotice(Outbox<BridgeEvent>);

impl Drop for ExitNotice {
    fn drop(&mut self) {
        self.0.send(BridgeEvent::Exited);
    }
}

fn run_worker<S>(
    name: &str,
    role: &str,
    config: EngineConfig,
    commands: CommandInbox,
    events: Outbox<BridgeEvent>,
    setup: S,
) where
    S: FnOnce(&Dispatcher, CommandInbox, Outbox<BridgeEvent>),
{
    let _exit = ExitNotice(events.clone());
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            WorkerRuntimeFailed {
                name,
                error: &error,
            }
            .log();
            return;
        }
    };

    let span = WorkerStarted { name, role }.span("worker_loop");
    runtime.block_on(
        async move {
            let dispatcher = Dispatcher::with_config(config);
            setup(&dispatcher, commands, events);
            dispatcher.run().await;
        }
        .instrument(span),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_runs_setup_and_reports_exit() {
        let mut config = EngineConfig::default();
        config.workers.thread_name = "millrace-test".to_string();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut worker = WorkerThread::spawn(&config, "test", tx, |dispatcher, _commands, events| {
            let name = std::thread::current().name().map(str::to_string);
            dispatcher.post(move || {
                assert_eq!(name.as_deref(), Some("millrace-test"));
                events.send(BridgeEvent::Ready);
            });
        })
        .unwrap();
        worker.join();

        assert!(worker.handle.is_none());
        assert_eq!(rx.try_recv().ok(), Some(BridgeEvent::Ready));
        assert_eq!(rx.try_recv().ok(), Some(BridgeEvent::Exited));
    }

    #[test]
    fn test_dropping_handle_stops_a_held_worker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = WorkerThread::spawn(
            &EngineConfig::default(),
            "test",
            tx,
            |dispatcher, commands, _events| {
                let hold = dispatcher.hold();
                let d = dispatcher.clone();
                dispatcher.spawn_inbox(commands, |_| {}, move || {
                    drop(hold);
                    d.shutdown();
                });
            },
        )
        .unwrap();
        drop(worker);
        assert_eq!(rx.try_recv().ok(), Some(BridgeEvent::Exited));
    }

    #[test]
    fn test_overflowing_stack_size_falls_back_to_default() {
        let mut config = EngineConfig::default();
        config.workers.stack_size_kb = Some(usize::MAX);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut worker = WorkerThread::spawn(&config, "test", tx, |dispatcher, _commands, events| {
            dispatcher.post(move || {
                events.send(BridgeEvent::Ready);
            });
        })
        .unwrap();
        worker.join();

        assert_eq!(rx.try_recv().ok(), Some(BridgeEvent::Ready));
        assert_eq!(rx.try_recv().ok(), Some(BridgeEvent::Exited));
    }
}
