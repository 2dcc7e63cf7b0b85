// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook dedupe ledger.
//!
//! Provider webhooks are at-least-once; every handler records its dedupe
//! key here first and stops if it was already seen.

use chrono::{DateTime, Utc};
use rusqlite::params;

use chaser_core::ChaserError;

use crate::database::{map_tr_err, to_ts, Database};

/// Record a webhook dedupe key. Returns `true` if this is the first time
/// the key has been seen.
pub async fn try_record(
    db: &Database,
    dedupe_key: &str,
    provider: &str,
    now: DateTime<Utc>,
) -> Result<bool, ChaserError> {
    let dedupe_key = dedupe_key.to_string();
    let provider = provider.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO webhook_events (dedupe_key, provider, received_at)
                 VALUES (?1, ?2, ?3)",
                params![dedupe_key, provider, now_ts],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Release a recorded dedupe key. Handlers that fail after recording use
/// this so the provider's retry of the same event is not treated as a
/// duplicate.
pub async fn release(db: &Database, dedupe_key: &str) -> Result<bool, ChaserError> {
    let dedupe_key = dedupe_key.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM webhook_events WHERE dedupe_key = ?1",
                params![dedupe_key],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Drop dedupe entries received before `cutoff`. Returns the number of
/// rows removed.
pub async fn prune_before(db: &Database, cutoff: DateTime<Utc>) -> Result<u64, ChaserError> {
    let cutoff_ts = to_ts(cutoff);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM webhook_events WHERE received_at < ?1",
                params![cutoff_ts],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}
