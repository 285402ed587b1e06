// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single-threaded reactive dataflow.
//!
//! A graph grows from a producer, is driven by the [`Dispatcher`] of the
//! thread it was built on and completes only once every value already in
//! flight below the producer has been handled.
//!
//! ```rust
//! use the_millrace::{Dispatcher, Stream, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = Dispatcher::new();
//! Stream::range(&dispatcher, 0, 4, 1)
//!     .map(|v| Value::from(v.as_i64().unwrap_or(0) * 2))
//!     .scan(0i64, |sum, v| *sum += v.as_i64().unwrap_or(0))
//!     .on_completed_last(|total| assert_eq!(total, Some(Value::from(12))));
//! dispatcher.run().await;
//! # }
//! ```

pub mod bridge;        // worker-thread handoff
pub mod config;        // engine settings
pub mod engine;        // graph, drain and the stream handle
pub mod errors;        // error handling
pub mod observability;
pub mod operators;     // nodes attached below a parent
pub mod scheduler;     // per-thread event loop and timers
pub mod sources;       // producers
pub mod traits;        // node and producer abstractions
pub mod value;

pub use config::EngineConfig;
pub use engine::{OwnedResource, ProducerState, Stream};
pub use errors::{BridgeError, ConfigError, StreamError, CANCEL_CODE, CANCEL_PAYLOAD};
pub use operators::Waiter;
pub use scheduler::{Dispatcher, LoopHold, Timer};
pub use sources::{Container, Queue};
pub use traits::{NodeId, Producer, Request, StreamNode, DEFER, REQUEST_ONE};
pub use value::Value;
