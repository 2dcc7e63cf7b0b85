// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, positive batch sizes, and sane
//! thresholds.

use crate::diagnostic::ConfigError;
use crate::model::ChaserConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ChaserConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.queue.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.batch_size must be at least 1".to_string(),
        });
    }

    if config.queue.claim_lock_minutes == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.claim_lock_minutes must be at least 1".to_string(),
        });
    }

    if config.webhooks.soft_bounce_threshold < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "webhooks.soft_bounce_threshold must be at least 1, got {}",
                config.webhooks.soft_bounce_threshold
            ),
        });
    }

    if config.scorer.window_days == 0 {
        errors.push(ConfigError::Validation {
            message: "scorer.window_days must be at least 1".to_string(),
        });
    }

    if config.scorer.min_delta < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "scorer.min_delta must be non-negative, got {}",
                config.scorer.min_delta
            ),
        });
    }

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if let Some(from) = &config.delivery.from_email
        && !from.contains('@')
    {
        errors.push(ConfigError::Validation {
            message: format!("delivery.from_email `{from}` is not an email address"),
        });
    }

    if config.engine.body_max_len == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.body_max_len must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
