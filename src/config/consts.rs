// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Minimum spacing between consecutive Delay deadlines, in milliseconds
pub const DEFAULT_DELAY_STAGGER_MS: u64 = 1;
/// Upper bound accepted for the Delay stagger, in milliseconds
pub const MAX_DELAY_STAGGER_MS: u64 = 1_000;
/// Interval a PullSource arms itself with when first started, in milliseconds
pub const DEFAULT_REQUEST_MS: u64 = 0;
/// Batch size at which a Buffer flushes when no capacity is given
pub const DEFAULT_BUFFER_CAPACITY: usize = 0xFFFFF - 1;
/// Largest worker thread stack accepted, in KiB (1 GiB)
pub const MAX_STACK_SIZE_KB: usize = 1024 * 1024;
/// Name given to bridge worker threads
pub const DEFAULT_WORKER_THREAD_NAME: &str = "millrace-worker";
/// Filter used by `init_tracing` when neither config nor `RUST_LOG` sets one
pub const DEFAULT_LOG_FILTER: &str = "info";
