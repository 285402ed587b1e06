// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failures starting the worker side of an async bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to spawn worker thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("the stream has no producer to bridge")]
    Detached,
}
