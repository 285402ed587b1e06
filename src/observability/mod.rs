// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Operational events are message structs with a `Display` impl so log text
//! lives in one place instead of being scattered through the engine. Each
//! message also implements [`messages::StructuredLog`], which emits it as a
//! structured `tracing` event at the level the event deserves.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - producer lifecycle, drain, error routing
//! * `messages::scheduler` - dispatcher loop lifecycle
//! * `messages::bridge` - worker threads behind the async bridge
//!
//! Per-value chatter is not modelled as messages; it goes straight to
//! `tracing::trace!`.

pub mod messages;

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to `filter`.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init();
}

/// [`init_tracing`] with the filter from the `logging` config section.
pub fn init_tracing_from(config: &LoggingConfig) {
    init_tracing(&config.filter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("debug");
        init_tracing("info");
        tracing::info!("still logging after second init");
    }

    #[test]
    fn test_init_from_config_section() {
        init_tracing_from(&LoggingConfig::default());
        tracing::debug!("config filter applied or first subscriber kept");
    }
}
