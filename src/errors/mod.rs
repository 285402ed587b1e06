// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod bridge;
mod config;
mod stream;

pub use bridge::BridgeError;
pub use config::ConfigError;
pub use stream::{StreamError, CANCEL_CODE, CANCEL_PAYLOAD};
