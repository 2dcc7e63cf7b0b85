// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chaser follow-up engine.

use thiserror::Error;

/// The primary error type used across all Chaser crates.
#[derive(Debug, Error)]
pub enum ChaserError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Delivery transport errors (provider API failure, connection errors).
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Recurrence pattern errors (unparseable time of day, zero interval).
    #[error("schedule error: {0}")]
    Schedule(String),

    /// A followup item or request failed pre-delivery validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
