// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chaser.toml` > `~/.config/chaser/chaser.toml` >
//! `/etc/chaser/chaser.toml` with environment variable overrides via the
//! `CHASER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ChaserConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chaser/chaser.toml` (system-wide)
/// 3. `~/.config/chaser/chaser.toml` (user XDG config)
/// 4. `./chaser.toml` (local directory)
/// 5. `CHASER_*` environment variables
pub fn load_config() -> Result<ChaserConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChaserConfig::default()))
        .merge(Toml::file("/etc/chaser/chaser.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("chaser/chaser.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("chaser.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ChaserConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChaserConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChaserConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChaserConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CHASER_QUEUE_BATCH_SIZE` must map to
/// `queue.batch_size`, not `queue.batch.size`.
fn env_provider() -> Env {
    Env::prefixed("CHASER_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: CHASER_DELIVERY_API_KEY -> "delivery_api_key"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("webhooks_", "webhooks.", 1)
            .replacen("scorer_", "scorer.", 1)
            .replacen("server_", "server.", 1);
        mapped.into()
    })
}
