// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Thread handoff.
//!
//! Graph nodes never cross threads. A worker thread builds its part of the
//! graph itself, from a `Send` closure, on its own dispatcher; the two sides
//! talk over ordered tokio channels carrying [`BridgeCommand`]s and
//! [`BridgeEvent`]s.

mod async_op;
mod messages;
mod proxy;
mod worker;

pub use async_op::AsyncWatcher;
pub use messages::{BridgeCommand, BridgeEvent};
pub use proxy::AsyncProducer;
