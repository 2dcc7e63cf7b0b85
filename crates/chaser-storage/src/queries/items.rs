// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Followup item state machine operations.
//!
//! All status transitions here are conditional updates: an item only moves
//! out of `queued` or `sending` if it is still in that state at update time.
//! That compare-and-swap is what keeps two overlapping processor runs from
//! both delivering the same item.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use chaser_core::types::{FollowupItem, FollowupStatus, RecurrencePattern};
use chaser_core::ChaserError;

use crate::database::{map_tr_err, parse_ts, parse_ts_opt, to_ts, Database};
use crate::models::{DueItem, Recipient};

const ITEM_COLS: &str = "id, owner_id, recipient_id, invoice_id, sequence_id, subject, body, \
     tone, channel, status, scheduled_at, sent_at, retry_count, max_retries, pause_on_reply, \
     cancel_if_paid, recurrence, occurrence, locked_until, provider_message_id, created_at, \
     updated_at";

const RECIPIENT_COLS: &str = "id, email, name, unsubscribed, followups_paused, last_reply_at, \
     engagement_score, soft_bounce_count, hard_bounce_count, complaint_count, created_at, \
     updated_at";

/// Map a followup item starting at column offset `off`.
pub(crate) fn map_item(row: &rusqlite::Row<'_>, off: usize) -> rusqlite::Result<FollowupItem> {
    let status_str: String = row.get(off + 9)?;
    let status = FollowupStatus::from_str(&status_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(off + 9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let recurrence_str: Option<String> = row.get(off + 16)?;
    let recurrence: Option<RecurrencePattern> = recurrence_str
        .map(|s| {
            serde_json::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    off + 16,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()?;

    Ok(FollowupItem {
        id: row.get(off)?,
        owner_id: row.get(off + 1)?,
        recipient_id: row.get(off + 2)?,
        invoice_id: row.get(off + 3)?,
        sequence_id: row.get(off + 4)?,
        subject: row.get(off + 5)?,
        body: row.get(off + 6)?,
        tone: row.get(off + 7)?,
        channel: row.get(off + 8)?,
        status,
        scheduled_at: parse_ts_opt(off + 10, row.get(off + 10)?)?,
        sent_at: parse_ts_opt(off + 11, row.get(off + 11)?)?,
        retry_count: row.get(off + 12)?,
        max_retries: row.get(off + 13)?,
        pause_on_reply: row.get(off + 14)?,
        cancel_if_paid: row.get(off + 15)?,
        recurrence,
        occurrence: row.get(off + 17)?,
        locked_until: parse_ts_opt(off + 18, row.get(off + 18)?)?,
        provider_message_id: row.get(off + 19)?,
        created_at: parse_ts(off + 20, &row.get::<_, String>(off + 20)?)?,
        updated_at: parse_ts(off + 21, &row.get::<_, String>(off + 21)?)?,
    })
}

pub(crate) fn map_recipient(row: &rusqlite::Row<'_>, off: usize) -> rusqlite::Result<Recipient> {
    Ok(Recipient {
        id: row.get(off)?,
        email: row.get(off + 1)?,
        name: row.get(off + 2)?,
        unsubscribed: row.get(off + 3)?,
        followups_paused: row.get(off + 4)?,
        last_reply_at: parse_ts_opt(off + 5, row.get(off + 5)?)?,
        engagement_score: row.get(off + 6)?,
        soft_bounce_count: row.get(off + 7)?,
        hard_bounce_count: row.get(off + 8)?,
        complaint_count: row.get(off + 9)?,
        created_at: parse_ts(off + 10, &row.get::<_, String>(off + 10)?)?,
        updated_at: parse_ts(off + 11, &row.get::<_, String>(off + 11)?)?,
    })
}

/// Insert a new followup item.
pub async fn insert_item(db: &Database, item: &FollowupItem) -> Result<(), ChaserError> {
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            let recurrence = item
                .recurrence
                .as_ref()
                .map(|p| serde_json::to_string(p))
                .transpose()
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                &format!("INSERT INTO followup_items ({ITEM_COLS}) VALUES \
                    (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
                     ?17, ?18, ?19, ?20, ?21, ?22)"),
                params![
                    item.id,
                    item.owner_id,
                    item.recipient_id,
                    item.invoice_id,
                    item.sequence_id,
                    item.subject,
                    item.body,
                    item.tone,
                    item.channel,
                    item.status.to_string(),
                    item.scheduled_at.map(to_ts),
                    item.sent_at.map(to_ts),
                    item.retry_count,
                    item.max_retries,
                    item.pause_on_reply,
                    item.cancel_if_paid,
                    recurrence,
                    item.occurrence,
                    item.locked_until.map(to_ts),
                    item.provider_message_id,
                    to_ts(item.created_at),
                    to_ts(item.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a followup item by id.
pub async fn get_item(db: &Database, id: &str) -> Result<Option<FollowupItem>, ChaserError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {ITEM_COLS} FROM followup_items WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], |row| map_item(row, 0));
            match result {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Return stale `sending` claims (lock expired) to `queued`.
///
/// Crash recovery: a processor run that died mid-batch leaves items in
/// `sending` past their lock deadline; the next run picks them up again.
pub async fn recover_stale(db: &Database, now: DateTime<Utc>) -> Result<u64, ChaserError> {
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_items
                 SET status = 'queued', locked_until = NULL, updated_at = ?1
                 WHERE status = 'sending' AND locked_until IS NOT NULL AND locked_until < ?1",
                params![now_ts],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim up to `limit` due items.
///
/// In a single transaction, selects `queued` rows with `scheduled_at <= now`
/// (joined with recipient state and the linked invoice status) and flips
/// each to `sending` with a lock deadline -- but only while it is still
/// `queued`. Rows that lost the race are not returned.
pub async fn claim_due(
    db: &Database,
    now: DateTime<Utc>,
    limit: u32,
    lock_minutes: u32,
) -> Result<Vec<DueItem>, ChaserError> {
    let now_ts = to_ts(now);
    let locked_until = to_ts(now + Duration::minutes(i64::from(lock_minutes)));
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let candidates = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {item_cols}, {recipient_cols}, inv.status
                     FROM followup_items i
                     JOIN recipients r ON r.id = i.recipient_id
                     LEFT JOIN invoices inv ON inv.id = i.invoice_id
                     WHERE i.status = 'queued'
                       AND i.scheduled_at IS NOT NULL
                       AND i.scheduled_at <= ?1
                     ORDER BY i.scheduled_at ASC
                     LIMIT ?2",
                    item_cols = prefixed(ITEM_COLS, "i"),
                    recipient_cols = prefixed(RECIPIENT_COLS, "r"),
                ))?;
                let rows = stmt.query_map(params![now_ts, limit], |row| {
                    let item = map_item(row, 0)?;
                    let recipient = map_recipient(row, 22)?;
                    let invoice_status: Option<String> = row.get(34)?;
                    Ok(DueItem { item, recipient, invoice_status })
                })?;
                let mut candidates = Vec::new();
                for row in rows {
                    candidates.push(row?);
                }
                candidates
            };

            let mut claimed = Vec::with_capacity(candidates.len());
            for mut due in candidates {
                let changed = tx.execute(
                    "UPDATE followup_items
                     SET status = 'sending', locked_until = ?1, updated_at = ?2
                     WHERE id = ?3 AND status = 'queued'",
                    params![locked_until, now_ts, due.item.id],
                )?;
                if changed == 1 {
                    due.item.status = FollowupStatus::Sending;
                    claimed.push(due);
                }
            }

            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a claimed item as sent.
///
/// Only succeeds while the item is still `sending`; returns whether the
/// transition happened.
pub async fn mark_sent(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
    provider_message_id: Option<String>,
) -> Result<bool, ChaserError> {
    let id = id.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_items
                 SET status = 'sent', sent_at = ?1, provider_message_id = ?2,
                     locked_until = NULL, updated_at = ?1
                 WHERE id = ?3 AND status = 'sending'",
                params![now_ts, provider_message_id, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Move a claimed item to `failed`, `cancelled`, or `paused`.
pub async fn finish_claim(
    db: &Database,
    id: &str,
    status: FollowupStatus,
    now: DateTime<Utc>,
) -> Result<bool, ChaserError> {
    debug_assert!(matches!(
        status,
        FollowupStatus::Failed | FollowupStatus::Cancelled | FollowupStatus::Paused
    ));
    let id = id.to_string();
    let status = status.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_items
                 SET status = ?1, locked_until = NULL, updated_at = ?2
                 WHERE id = ?3 AND status = 'sending'",
                params![status, now_ts, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Reschedule a claimed item for a retry: bump the counter, set the new
/// due time, and return it to `queued`.
pub async fn schedule_retry(
    db: &Database,
    id: &str,
    retry_count: u32,
    next_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<bool, ChaserError> {
    let id = id.to_string();
    let next_ts = to_ts(next_at);
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_items
                 SET status = 'queued', retry_count = ?1, scheduled_at = ?2,
                     locked_until = NULL, updated_at = ?3
                 WHERE id = ?4 AND status = 'sending'",
                params![retry_count, next_ts, now_ts, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Return a claimed item to `queued` without touching its schedule.
///
/// Used when validation skips an item: not a delivery attempt, so neither
/// the retry counter nor the due time moves.
pub async fn release_claim(db: &Database, id: &str, now: DateTime<Utc>) -> Result<bool, ChaserError> {
    let id = id.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_items
                 SET status = 'queued', locked_until = NULL, updated_at = ?1
                 WHERE id = ?2 AND status = 'sending'",
                params![now_ts, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Cancel every currently `queued` item for a recipient.
pub async fn cancel_queued_for_recipient(
    db: &Database,
    recipient_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, ChaserError> {
    let recipient_id = recipient_id.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_items
                 SET status = 'cancelled', updated_at = ?1
                 WHERE recipient_id = ?2 AND status = 'queued'",
                params![now_ts, recipient_id],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Pause every currently `queued` item for a recipient that carries the
/// pause-on-reply guard.
pub async fn pause_queued_with_reply_guard(
    db: &Database,
    recipient_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, ChaserError> {
    let recipient_id = recipient_id.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_items
                 SET status = 'paused', updated_at = ?1
                 WHERE recipient_id = ?2 AND status = 'queued' AND pause_on_reply = 1",
                params![now_ts, recipient_id],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve an item (and its recipient) by the provider's message id.
pub async fn find_by_provider_message_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<(String, String)>, ChaserError> {
    let pmid = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, recipient_id FROM followup_items WHERE provider_message_id = ?1",
                params![pmid],
                |row| Ok((row.get(0)?, row.get(1)?)),
            );
            match result {
                Ok(pair) => Ok(Some(pair)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Most-recent-message heuristic: the latest sent item for a recipient,
/// used when a webhook carries no message id.
pub async fn latest_sent_for_recipient(
    db: &Database,
    recipient_id: &str,
) -> Result<Option<String>, ChaserError> {
    let recipient_id = recipient_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id FROM followup_items
                 WHERE recipient_id = ?1 AND status = 'sent'
                 ORDER BY sent_at DESC LIMIT 1",
                params![recipient_id],
                |row| row.get(0),
            );
            match result {
                Ok(id) => Ok(Some(id)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Prefix each column in a comma-separated list with a table alias.
fn prefixed(cols: &str, alias: &str) -> String {
    cols.split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
