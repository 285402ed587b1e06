// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod drain;
pub mod graph;
pub mod node_core;
pub mod ownership;
pub mod producer_core;
pub mod signal;
pub mod stream;
#[cfg(test)]
mod integration_tests;

pub use node_core::NodeCore;
pub use ownership::OwnedResource;
pub use producer_core::{ProducerCore, ProducerState};
pub use stream::Stream;
