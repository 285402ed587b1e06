// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{MAX_DELAY_STAGGER_MS, MAX_STACK_SIZE_KB};
use crate::config::EngineConfig;
use crate::errors::ConfigError;

/// Check the values that deserialization alone cannot rule out.
pub fn validate_config(cfg: &EngineConfig) -> Result<(), ConfigError> {
    if cfg.workers.thread_name.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "workers.thread_name",
            reason: "must not be empty".to_string(),
        });
    }

    if cfg.operators.buffer_capacity == 0 {
        return Err(ConfigError::InvalidValue {
            field: "operators.buffer_capacity",
            reason: "must be at least 1".to_string(),
        });
    }

    if cfg.scheduler.delay_stagger_ms > MAX_DELAY_STAGGER_MS {
        return Err(ConfigError::InvalidValue {
            field: "scheduler.delay_stagger_ms",
            reason: format!(
                "{} exceeds the maximum of {}",
                cfg.scheduler.delay_stagger_ms, MAX_DELAY_STAGGER_MS
            ),
        });
    }

    match cfg.workers.stack_size_kb {
        Some(0) => {
            return Err(ConfigError::InvalidValue {
                field: "workers.stack_size_kb",
                reason: "must be greater than zero when set".to_string(),
            })
        }
        Some(kb) if kb > MAX_STACK_SIZE_KB => {
            return Err(ConfigError::InvalidValue {
                field: "workers.stack_size_kb",
                reason: format!("{kb} exceeds the maximum of {MAX_STACK_SIZE_KB}"),
            })
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_thread_name_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.workers.thread_name = "  ".to_string();

        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "workers.thread_name", .. }
        ));
    }

    #[test]
    fn test_large_stagger_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.scheduler.delay_stagger_ms = 5_000;

        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum of 1000"));
    }

    #[test]
    fn test_oversized_stack_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.workers.stack_size_kb = Some(usize::MAX);

        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "workers.stack_size_kb", .. }
        ));

        cfg.workers.stack_size_kb = Some(MAX_STACK_SIZE_KB);
        assert!(validate_config(&cfg).is_ok());
    }
}
