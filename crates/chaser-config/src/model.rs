// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Chaser follow-up engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Chaser configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChaserConfig {
    /// Engine-wide settings (logging, content caps).
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Queue processor settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Delivery transport settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Webhook surface settings.
    #[serde(default)]
    pub webhooks: WebhookConfig,

    /// Engagement scorer settings.
    #[serde(default)]
    pub scorer: ScorerConfig,

    /// HTTP trigger server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum subject length accepted from a scheduling request.
    #[serde(default = "default_subject_max_len")]
    pub subject_max_len: usize,

    /// Maximum body length accepted from a scheduling request. AI-generated
    /// content is opaque text; this cap is the only validation applied.
    #[serde(default = "default_body_max_len")]
    pub body_max_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            subject_max_len: default_subject_max_len(),
            body_max_len: default_body_max_len(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_subject_max_len() -> usize {
    200
}

fn default_body_max_len() -> usize {
    50_000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chaser").join("chaser.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chaser.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Queue processor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum items claimed per processor batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Default retry budget for newly scheduled items.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,

    /// Minutes a claimed (`sending`) item stays locked before a later batch
    /// may recover it as stale.
    #[serde(default = "default_claim_lock_minutes")]
    pub claim_lock_minutes: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            default_max_retries: default_max_retries(),
            claim_lock_minutes: default_claim_lock_minutes(),
        }
    }
}

fn default_batch_size() -> u32 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_claim_lock_minutes() -> u32 {
    10
}

/// Delivery transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Base URL of the provider email API.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Provider API key. `None` requires environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// From address used for all outbound followups.
    #[serde(default)]
    pub from_email: Option<String>,

    /// Business name substituted into message templates.
    #[serde(default = "default_business_name")]
    pub business_name: String,

    /// Per-request timeout against the provider.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Ask the provider to track opens.
    #[serde(default = "default_tracking")]
    pub open_tracking: bool,

    /// Ask the provider to track clicks.
    #[serde(default = "default_tracking")]
    pub click_tracking: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            provider_url: default_provider_url(),
            api_key: None,
            from_email: None,
            business_name: default_business_name(),
            request_timeout_secs: default_request_timeout_secs(),
            open_tracking: default_tracking(),
            click_tracking: default_tracking(),
        }
    }
}

fn default_provider_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_business_name() -> String {
    "Chaser".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_tracking() -> bool {
    true
}

/// Webhook surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Shared secret compared against the `x-chaser-webhook-secret` header.
    /// `None` rejects all webhook deliveries (fail-closed).
    #[serde(default)]
    pub shared_secret: Option<String>,

    /// Soft bounces tolerated before a recipient is suspended.
    #[serde(default = "default_soft_bounce_threshold")]
    pub soft_bounce_threshold: i64,

    /// Days to keep webhook dedupe keys before the cleanup job prunes them.
    #[serde(default = "default_dedupe_retention_days")]
    pub dedupe_retention_days: u32,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            soft_bounce_threshold: default_soft_bounce_threshold(),
            dedupe_retention_days: default_dedupe_retention_days(),
        }
    }
}

fn default_soft_bounce_threshold() -> i64 {
    5
}

fn default_dedupe_retention_days() -> u32 {
    30
}

/// Engagement scorer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScorerConfig {
    /// Trailing window of delivery events considered, in days.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Minimum score change that gets persisted; smaller deltas are noise.
    #[serde(default = "default_min_delta")]
    pub min_delta: i64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            min_delta: default_min_delta(),
        }
    }
}

fn default_window_days() -> u32 {
    30
}

fn default_min_delta() -> i64 {
    5
}

/// HTTP trigger server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the trigger endpoints. `None` rejects all
    /// trigger invocations (fail-closed).
    #[serde(default)]
    pub trigger_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trigger_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8440
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ChaserConfig::default();
        assert_eq!(config.queue.batch_size, 100);
        assert_eq!(config.queue.default_max_retries, 3);
        assert_eq!(config.webhooks.soft_bounce_threshold, 5);
        assert_eq!(config.scorer.window_days, 30);
        assert!(config.server.trigger_token.is_none());
        assert!(config.webhooks.shared_secret.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[queue]
batch_size = 50
bacth_size = 10
"#;
        let result = toml::from_str::<ChaserConfig>(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let toml_str = r#"
[delivery]
from_email = "billing@example.com"
"#;
        let config: ChaserConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.delivery.from_email.as_deref(), Some("billing@example.com"));
        assert_eq!(config.delivery.request_timeout_secs, 30);
        assert!(config.delivery.open_tracking);
    }
}
