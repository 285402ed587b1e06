// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for producer lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Completion drain progress and final completion
//! * Cancellation, both graceful and imperative
//! * Error routing through a rooted tree
//! * Release of owned resources

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A producer fired its completion callbacks and broadcast `completed`.
///
/// # Log Level
/// `debug!` - Happens once per producer
pub struct ProducerCompleted<'a> {
    pub node_id: u64,
    pub kind: &'a str,
    pub callbacks: usize,
}

impl Display for ProducerCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Producer {}#{} completed, firing {} completion callback(s)",
            self.kind, self.node_id, self.callbacks
        )
    }
}

impl StructuredLog for ProducerCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            node_id = self.node_id,
            kind = self.kind,
            callbacks = self.callbacks,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "producer_completed",
            span_name = name,
            node_id = self.node_id,
            kind = self.kind,
        )
    }
}

/// A producer was cancelled and skipped the drain.
///
/// # Log Level
/// `debug!`
pub struct ProducerCancelled<'a> {
    pub node_id: u64,
    pub kind: &'a str,
    pub descendants: usize,
}

impl Display for ProducerCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Producer {}#{} cancelled along with {} descendant(s)",
            self.kind, self.node_id, self.descendants
        )
    }
}

impl StructuredLog for ProducerCancelled<'_> {
    fn log(&self) {
        tracing::debug!(
            node_id = self.node_id,
            kind = self.kind,
            descendants = self.descendants,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "producer_cancelled",
            span_name = name,
            node_id = self.node_id,
            kind = self.kind,
        )
    }
}

/// Completion is parked until a busy descendant pulses `waitOver`.
///
/// # Log Level
/// `trace!` - May repeat many times while a subtree drains
pub struct DrainDeferred<'a> {
    pub producer_id: u64,
    pub busy_id: u64,
    pub busy_kind: &'a str,
    pub in_flight: usize,
}

impl Display for DrainDeferred<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Completion of producer #{} waits on {}#{} ({} value(s) in flight)",
            self.producer_id, self.busy_kind, self.busy_id, self.in_flight
        )
    }
}

impl StructuredLog for DrainDeferred<'_> {
    fn log(&self) {
        tracing::trace!(
            producer_id = self.producer_id,
            busy_id = self.busy_id,
            busy_kind = self.busy_kind,
            in_flight = self.in_flight,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "drain_deferred",
            span_name = name,
            producer_id = self.producer_id,
            busy_id = self.busy_id,
        )
    }
}

/// An error reached the root and was handed to the tree's handlers.
///
/// # Log Level
/// `warn!` for fatal errors, `debug!` otherwise
pub struct ErrorRouted<'a> {
    pub root_id: u64,
    pub error: &'a crate::errors::StreamError,
    pub handlers: usize,
}

impl Display for ErrorRouted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Routed {} to {} handler(s) under root #{}",
            self.error, self.handlers, self.root_id
        )
    }
}

impl StructuredLog for ErrorRouted<'_> {
    fn log(&self) {
        if self.error.fatal {
            tracing::warn!(
                root_id = self.root_id,
                code = self.error.code,
                fatal = true,
                handlers = self.handlers,
                "{}", self
            );
        } else {
            tracing::debug!(
                root_id = self.root_id,
                code = self.error.code,
                fatal = false,
                handlers = self.handlers,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "error_routed",
            span_name = name,
            root_id = self.root_id,
            code = self.error.code,
            fatal = self.error.fatal,
        )
    }
}

/// The whole rooted tree was cancelled imperatively or by a fatal error.
///
/// # Log Level
/// `info!`
pub struct StreamCancelled<'a> {
    pub root_id: u64,
    pub kind: &'a str,
}

impl Display for StreamCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stream rooted at {}#{} cancelled", self.kind, self.root_id)
    }
}

impl StructuredLog for StreamCancelled<'_> {
    fn log(&self) {
        tracing::info!(root_id = self.root_id, kind = self.kind, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stream_cancelled",
            span_name = name,
            root_id = self.root_id,
            kind = self.kind,
        )
    }
}

/// Owned resources were released when their producer was dropped.
///
/// # Log Level
/// `debug!`
pub struct ResourcesReleased {
    pub producer_id: u64,
    pub count: usize,
}

impl Display for ResourcesReleased {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Released {} owned resource(s) of producer #{}",
            self.count, self.producer_id
        )
    }
}

impl StructuredLog for ResourcesReleased {
    fn log(&self) {
        tracing::debug!(producer_id = self.producer_id, count = self.count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("resources_released", span_name = name, producer_id = self.producer_id)
    }
}

/// A producer was dropped while still holding completion callbacks.
///
/// # Log Level
/// `warn!` - The callbacks are dropped unfired
pub struct CallbacksDropped {
    pub producer_id: u64,
    pub count: usize,
}

impl Display for CallbacksDropped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Producer #{} dropped with {} unfired completion callback(s)",
            self.producer_id, self.count
        )
    }
}

impl StructuredLog for CallbacksDropped {
    fn log(&self) {
        tracing::warn!(producer_id = self.producer_id, count = self.count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("callbacks_dropped", span_name = name, producer_id = self.producer_id)
    }
}

/// An operation needed a producer but the node is no longer attached to one.
///
/// # Log Level
/// `warn!`
pub struct DetachedNode<'a> {
    pub node_id: u64,
    pub kind: &'a str,
    pub operation: &'a str,
}

impl Display for DetachedNode<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ignoring {} on {}#{}: node has no producer",
            self.operation, self.kind, self.node_id
        )
    }
}

impl StructuredLog for DetachedNode<'_> {
    fn log(&self) {
        tracing::warn!(
            node_id = self.node_id,
            kind = self.kind,
            operation = self.operation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("detached_node", span_name = name, node_id = self.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StreamError;

    #[test]
    fn test_drain_deferred_display() {
        let msg = DrainDeferred {
            producer_id: 1,
            busy_id: 4,
            busy_kind: "delay",
            in_flight: 2,
        };
        assert_eq!(
            msg.to_string(),
            "Completion of producer #1 waits on delay#4 (2 value(s) in flight)"
        );
    }

    #[test]
    fn test_error_routed_display() {
        let error = StreamError::cancellation();
        let msg = ErrorRouted {
            root_id: 3,
            error: &error,
            handlers: 1,
        };
        assert_eq!(
            msg.to_string(),
            "Routed stream error 1000 (fatal: true): Stream::Cancel to 1 handler(s) under root #3"
        );
        msg.log();
    }
}
