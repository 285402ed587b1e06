// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod node;
pub mod producer;

pub use node::{NodeId, StreamNode};
pub use producer::{Producer, Request, DEFER, REQUEST_ONE};
