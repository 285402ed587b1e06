// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! What crosses the thread boundary. Everything here is `Send`; nodes never
//! are.

use crate::errors::StreamError;
use crate::observability::messages::bridge::BridgeMessageDropped;
use crate::observability::messages::StructuredLog;
use crate::traits::Request;
use crate::value::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Origin to worker.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    Request(Request),
    Defer,
    Cancel,
    Complete,
    /// A value for the worker-side inlet.
    Push(Value),
    /// The origin-side parent finished; drain and exit.
    Finish,
}

/// Worker to origin.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// The hosted subgraph is built and accepts input.
    Ready,
    Next(Value),
    WaitOver,
    Completed,
    Error(StreamError),
    /// The worker's event loop has returned.
    Exited,
}

/// Short name for log lines.
pub(crate) trait Labelled {
    fn label(&self) -> &'static str;
}

impl Labelled for BridgeCommand {
    fn label(&self) -> &'static str {
        match self {
            BridgeCommand::Request(_) => "request",
            BridgeCommand::Defer => "defer",
            BridgeCommand::Cancel => "cancel",
            BridgeCommand::Complete => "complete",
            BridgeCommand::Push(_) => "push",
            BridgeCommand::Finish => "finish",
        }
    }
}

impl Labelled for BridgeEvent {
    fn label(&self) -> &'static str {
        match self {
            BridgeEvent::Ready => "ready",
            BridgeEvent::Next(_) => "next",
            BridgeEvent::WaitOver => "wait_over",
            BridgeEvent::Completed => "completed",
            BridgeEvent::Error(_) => "error",
            BridgeEvent::Exited => "exited",
        }
    }
}

/// Sending half of one bridge direction. Sends after the other side hung up
/// are logged and dropped.
pub(crate) struct Outbox<M> {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Clone for Outbox<M> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
        }
    }
}

impl<M: Labelled> Outbox<M> {
    pub(crate) fn new(name: Arc<str>, tx: mpsc::UnboundedSender<M>) -> Self {
        Self { name, tx }
    }

    pub(crate) fn send(&self, message: M) -> bool {
        match self.tx.send(message) {
            Ok(()) => true,
            Err(mpsc::error::SendError(message)) => {
                BridgeMessageDropped {
                    name: &self.name,
                    message: message.label(),
                }
                .log();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_after_hangup_is_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbox = Outbox::new(Arc::from("test"), tx);
        assert!(outbox.send(BridgeEvent::Ready));
        drop(rx);
        assert!(!outbox.send(BridgeEvent::Next(Value::Int(1))));
    }
}
