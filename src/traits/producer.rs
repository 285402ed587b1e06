// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::{drain, ProducerCore};
use crate::traits::StreamNode;
use std::time::Duration;

/// Wire value meaning "emit exactly one value now".
pub const REQUEST_ONE: i64 = -1;
/// Wire value meaning "suspend emission".
pub const DEFER: i64 = -2;

/// How a producer should emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    One,
    Defer,
    Every(Duration),
}

impl Request {
    /// Decode the integer form: `-1` is one, `-2` is defer, other negative
    /// values behave like one, and anything else is an interval in ms.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            DEFER => Request::Defer,
            ms if ms < 0 => Request::One,
            ms => Request::Every(Duration::from_millis(ms.unsigned_abs())),
        }
    }

    pub fn as_millis(&self) -> i64 {
        match self {
            Request::One => REQUEST_ONE,
            Request::Defer => DEFER,
            Request::Every(interval) => i64::try_from(interval.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

impl From<i64> for Request {
    fn from(ms: i64) -> Self {
        Request::from_millis(ms)
    }
}

impl From<Duration> for Request {
    fn from(interval: Duration) -> Self {
        Request::Every(interval)
    }
}

/// A root-capable node that owns the backpressure contract.
pub trait Producer: StreamNode {
    fn producer_core(&self) -> &ProducerCore;

    fn request(&self, request: Request) {
        self.producer_core().remember(request);
    }

    fn defer(&self) {
        self.producer_core().remember(Request::Defer);
    }

    /// Graceful completion: waits for the subtree to drain.
    fn complete(&self) {
        if let Some(me) = self.producer_core().shared() {
            drain::complete(&me);
        }
    }

    /// Re-issue the last non-defer request.
    fn request_again(&self) {
        self.request(self.producer_core().last_request());
    }
}
