// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::value::Value;
use thiserror::Error;

/// Payload carried by the cancellation error.
pub const CANCEL_PAYLOAD: &str = "Stream::Cancel";

/// Code carried by the cancellation error.
pub const CANCEL_CODE: i32 = 1000;

/// The error object routed through a stream graph.
///
/// Data errors are non-fatal and may be raised any number of times. A fatal
/// error cancels the whole rooted tree after its handlers have run.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("stream error {code} (fatal: {fatal}): {payload}")]
pub struct StreamError {
    pub payload: Value,
    pub code: i32,
    pub fatal: bool,
}

impl StreamError {
    pub fn new(payload: impl Into<Value>, code: i32, fatal: bool) -> Self {
        Self {
            payload: payload.into(),
            code,
            fatal,
        }
    }

    /// The reserved error synthesized by an imperative cancel. Always fatal.
    pub fn cancellation() -> Self {
        Self::new(CANCEL_PAYLOAD, CANCEL_CODE, true)
    }

    pub fn is_cancellation(&self) -> bool {
        self.code == CANCEL_CODE && self.payload.as_str() == Some(CANCEL_PAYLOAD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_fatal() {
        let err = StreamError::cancellation();
        assert!(err.fatal);
        assert_eq!(err.code, 1000);
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_user_error_with_same_code_is_not_cancellation() {
        let err = StreamError::new("boom", CANCEL_CODE, true);
        assert!(!err.is_cancellation());
    }

    #[test]
    fn test_display_includes_code_and_payload() {
        let err = StreamError::new("bad input", 42, false);
        assert_eq!(err.to_string(), "stream error 42 (fatal: false): bad input");
    }
}
