// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Root producers.
//!
//! Every pull-based source shares [`PullSource`]; the modules here only supply
//! the data side. [`Merge`] is the one source built from other streams.

pub mod container;
pub mod func;
pub mod iterator;
pub mod merge;
pub mod pull;
pub mod queue;
pub mod range;
pub mod repeater;
pub mod single;

pub use container::{Container, ContainerLogic};
pub use func::FuncLogic;
pub use iterator::IteratorLogic;
pub use merge::Merge;
pub use pull::{Pull, PullSource, Pulled};
pub use queue::{Queue, QueueLogic};
pub use range::RangeLogic;
pub use repeater::RepeaterLogic;
pub use single::SingleLogic;
