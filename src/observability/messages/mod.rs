// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Organization
//!
//! * `engine` - producer lifecycle, completion drain and error routing
//! * `scheduler` - dispatcher loop events
//! * `bridge` - worker thread lifecycle
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_millrace::observability::messages::engine::StreamCancelled;
//! use the_millrace::observability::messages::StructuredLog;
//!
//! let msg = StreamCancelled { root_id: 7, kind: "range" };
//! msg.log();
//! assert_eq!(msg.to_string(), "Stream rooted at range#7 cancelled");
//! ```

use tracing::Span;

pub mod bridge;
pub mod engine;
pub mod scheduler;

/// A message that knows how to emit itself as a structured `tracing` event.
pub trait StructuredLog: std::fmt::Display {
    /// Emit the message at its natural level with its fields attached.
    fn log(&self);

    /// Build a span carrying the message fields.
    fn span(&self, name: &str) -> Span;
}
