// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Housekeeping: webhook dedupe pruning and stale-claim recovery.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use chaser_config::model::WebhookConfig;
use chaser_core::ChaserError;
use chaser_storage::queries::{items, webhooks};
use chaser_storage::Database;

/// Result of one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub pruned_webhook_rows: u64,
    pub recovered_claims: u64,
}

/// Prune expired webhook dedupe keys and recover stale claims.
pub async fn run_cleanup(
    db: &Database,
    config: &WebhookConfig,
    now: DateTime<Utc>,
) -> Result<CleanupSummary, ChaserError> {
    let cutoff = now - Duration::days(i64::from(config.dedupe_retention_days));
    let pruned_webhook_rows = webhooks::prune_before(db, cutoff).await?;
    let recovered_claims = items::recover_stale(db, now).await?;
    info!(pruned_webhook_rows, recovered_claims, "cleanup complete");
    Ok(CleanupSummary { pruned_webhook_rows, recovered_claims })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaser_test_utils::{temp_db, test_now};

    #[tokio::test]
    async fn prunes_only_expired_dedupe_keys() {
        let (db, _dir) = temp_db().await;
        let now = test_now();

        webhooks::try_record(&db, "old", "resend", now - Duration::days(45))
            .await
            .unwrap();
        webhooks::try_record(&db, "recent", "resend", now).await.unwrap();

        let summary = run_cleanup(&db, &WebhookConfig::default(), now).await.unwrap();
        assert_eq!(summary.pruned_webhook_rows, 1);
        assert_eq!(summary.recovered_claims, 0);
    }
}
