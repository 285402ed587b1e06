// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for worker threads behind the async bridge.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A worker thread was spawned for a hosted subgraph.
///
/// # Log Level
/// `info!`
pub struct WorkerStarted<'a> {
    pub name: &'a str,
    pub role: &'a str,
}

impl Display for WorkerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Started worker thread '{}' for {}", self.name, self.role)
    }
}

impl StructuredLog for WorkerStarted<'_> {
    fn log(&self) {
        tracing::info!(worker = self.name, role = self.role, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("worker", span_name = name, worker = self.name, role = self.role)
    }
}

/// A worker thread finished and was joined by its origin.
///
/// # Log Level
/// `info!`
pub struct WorkerJoined<'a> {
    pub name: &'a str,
}

impl Display for WorkerJoined<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Joined worker thread '{}'", self.name)
    }
}

impl StructuredLog for WorkerJoined<'_> {
    fn log(&self) {
        tracing::info!(worker = self.name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("worker_joined", span_name = name, worker = self.name)
    }
}

/// The worker thread panicked; its subgraph is gone.
///
/// # Log Level
/// `error!`
pub struct WorkerPanicked<'a> {
    pub name: &'a str,
}

impl Display for WorkerPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker thread '{}' panicked", self.name)
    }
}

impl StructuredLog for WorkerPanicked<'_> {
    fn log(&self) {
        tracing::error!(worker = self.name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("worker_panicked", span_name = name, worker = self.name)
    }
}

/// The worker could not build its tokio runtime.
///
/// # Log Level
/// `error!`
pub struct WorkerRuntimeFailed<'a> {
    pub name: &'a str,
    pub error: &'a std::io::Error,
}

impl Display for WorkerRuntimeFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker thread '{}' failed to build its runtime: {}",
            self.name, self.error
        )
    }
}

impl StructuredLog for WorkerRuntimeFailed<'_> {
    fn log(&self) {
        tracing::error!(worker = self.name, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("worker_runtime_failed", span_name = name, worker = self.name)
    }
}

/// A message could not be delivered because the other side of the bridge is gone.
///
/// # Log Level
/// `debug!` - Expected while a worker is shutting down
pub struct BridgeMessageDropped<'a> {
    pub name: &'a str,
    pub message: &'a str,
}

impl Display for BridgeMessageDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropped {} for worker '{}': channel closed",
            self.message, self.name
        )
    }
}

impl StructuredLog for BridgeMessageDropped<'_> {
    fn log(&self) {
        tracing::debug!(worker = self.name, message = self.message, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("bridge_message_dropped", span_name = name, worker = self.name)
    }
}
