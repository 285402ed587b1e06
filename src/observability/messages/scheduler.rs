// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the per-thread dispatcher loop.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// The dispatcher loop started running.
pub struct LoopStarted {
    pub queued_jobs: usize,
    pub armed_timers: usize,
}

impl Display for LoopStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatcher loop started with {} queued job(s) and {} armed timer(s)",
            self.queued_jobs, self.armed_timers
        )
    }
}

impl StructuredLog for LoopStarted {
    fn log(&self) {
        tracing::debug!(
            queued_jobs = self.queued_jobs,
            armed_timers = self.armed_timers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("dispatcher", span_name = name)
    }
}

/// The loop returned because nothing was left to do.
pub struct LoopIdle {
    pub jobs_run: u64,
    pub live_roots: usize,
}

impl Display for LoopIdle {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatcher idle after {} job(s), {} root(s) still live",
            self.jobs_run, self.live_roots
        )
    }
}

impl StructuredLog for LoopIdle {
    fn log(&self) {
        tracing::debug!(jobs_run = self.jobs_run, live_roots = self.live_roots, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("dispatcher_idle", span_name = name)
    }
}

/// The loop returned because `shutdown` was requested.
pub struct LoopShutdown {
    pub jobs_run: u64,
    pub pending_jobs: usize,
}

impl Display for LoopShutdown {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatcher shut down after {} job(s), discarding {} pending",
            self.jobs_run, self.pending_jobs
        )
    }
}

impl StructuredLog for LoopShutdown {
    fn log(&self) {
        tracing::debug!(jobs_run = self.jobs_run, pending_jobs = self.pending_jobs, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("dispatcher_shutdown", span_name = name)
    }
}
