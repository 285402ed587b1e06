// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_DELAY_STAGGER_MS, DEFAULT_LOG_FILTER, DEFAULT_REQUEST_MS,
    DEFAULT_WORKER_THREAD_NAME,
};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration.
///
/// Every section is optional; an empty document yields the defaults.
///
/// # Example
/// ```yaml
/// scheduler:
///   delay_stagger_ms: 1
///   default_request_ms: 0
/// workers:
///   thread_name: millrace-worker
///   stack_size_kb: 512
/// operators:
///   buffer_capacity: 1024
/// logging:
///   filter: "the_millrace=debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub operators: OperatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timing knobs of the per-thread dispatcher.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    #[serde(default = "default_delay_stagger_ms")]
    pub delay_stagger_ms: u64,
    #[serde(default = "default_request_ms")]
    pub default_request_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delay_stagger_ms: DEFAULT_DELAY_STAGGER_MS,
            default_request_ms: DEFAULT_REQUEST_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn delay_stagger(&self) -> Duration {
        Duration::from_millis(self.delay_stagger_ms)
    }

    pub fn default_request(&self) -> Duration {
        Duration::from_millis(self.default_request_ms)
    }
}

/// Settings for the threads started by the async bridge.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WorkerConfig {
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    pub stack_size_kb: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            stack_size_kb: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OperatorConfig {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_delay_stagger_ms() -> u64 {
    DEFAULT_DELAY_STAGGER_MS
}

fn default_request_ms() -> u64 {
    DEFAULT_REQUEST_MS
}

fn default_thread_name() -> String {
    DEFAULT_WORKER_THREAD_NAME.to_string()
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Load a config file, picking the format from its extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "yaml" | "yml" => EngineConfig::from_yaml_str(&content),
        "toml" => EngineConfig::from_toml_str(&content),
        _ => Err(ConfigError::UnsupportedFormat { extension }),
    }
}

/// Load a config file and reject values the engine cannot run with.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg)?;
    Ok(cfg)
}
