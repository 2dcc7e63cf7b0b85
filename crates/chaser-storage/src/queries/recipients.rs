// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient state: suspension, bounce counters, reply tracking, and the
//! engagement score.

use chrono::{DateTime, Utc};
use rusqlite::params;

use chaser_core::types::{BounceType, Recipient};
use chaser_core::ChaserError;

use crate::database::{map_tr_err, to_ts, Database};
use crate::queries::items::map_recipient;

const RECIPIENT_COLS: &str = "id, email, name, unsubscribed, followups_paused, last_reply_at, \
     engagement_score, soft_bounce_count, hard_bounce_count, complaint_count, created_at, \
     updated_at";

/// Insert a new recipient.
pub async fn insert_recipient(db: &Database, recipient: &Recipient) -> Result<(), ChaserError> {
    let r = recipient.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO recipients ({RECIPIENT_COLS}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    r.id,
                    r.email,
                    r.name,
                    r.unsubscribed,
                    r.followups_paused,
                    r.last_reply_at.map(to_ts),
                    r.engagement_score,
                    r.soft_bounce_count,
                    r.hard_bounce_count,
                    r.complaint_count,
                    to_ts(r.created_at),
                    to_ts(r.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a recipient by id.
pub async fn get_recipient(db: &Database, id: &str) -> Result<Option<Recipient>, ChaserError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {RECIPIENT_COLS} FROM recipients WHERE id = ?1"),
                params![id],
                |row| map_recipient(row, 0),
            );
            match result {
                Ok(r) => Ok(Some(r)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get a recipient by email address.
pub async fn get_recipient_by_email(
    db: &Database,
    email: &str,
) -> Result<Option<Recipient>, ChaserError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {RECIPIENT_COLS} FROM recipients WHERE email = ?1"),
                params![email],
                |row| map_recipient(row, 0),
            );
            match result {
                Ok(r) => Ok(Some(r)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Suspend a recipient: no further followups will be sent to them.
pub async fn suspend_recipient(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
) -> Result<bool, ChaserError> {
    let id = id.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE recipients SET unsubscribed = 1, updated_at = ?1 WHERE id = ?2",
                params![now_ts, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Increment the bounce counter for a bounce type and return the new count.
pub async fn increment_bounce_count(
    db: &Database,
    id: &str,
    bounce_type: BounceType,
    now: DateTime<Utc>,
) -> Result<i64, ChaserError> {
    let id = id.to_string();
    let now_ts = to_ts(now);
    let column = match bounce_type {
        BounceType::Soft => "soft_bounce_count",
        BounceType::Hard => "hard_bounce_count",
        BounceType::Complaint => "complaint_count",
    };
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                &format!(
                    "UPDATE recipients SET {column} = {column} + 1, updated_at = ?1
                     WHERE id = ?2 RETURNING {column}"
                ),
                params![now_ts, id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// Advance `last_reply_at`, keeping it monotonic: an out-of-order webhook
/// replay never moves it backwards.
pub async fn touch_last_reply(
    db: &Database,
    id: &str,
    replied_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ChaserError> {
    let id = id.to_string();
    let replied_ts = to_ts(replied_at);
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE recipients
                 SET last_reply_at = CASE
                         WHEN last_reply_at IS NULL OR last_reply_at < ?1 THEN ?1
                         ELSE last_reply_at
                     END,
                     updated_at = ?2
                 WHERE id = ?3",
                params![replied_ts, now_ts, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Add a delta to the engagement score, clamped to [0, 100].
pub async fn add_engagement(
    db: &Database,
    id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<i64, ChaserError> {
    let id = id.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            let score = conn.query_row(
                "UPDATE recipients
                 SET engagement_score = MAX(0, MIN(100, engagement_score + ?1)),
                     updated_at = ?2
                 WHERE id = ?3 RETURNING engagement_score",
                params![delta, now_ts, id],
                |row| row.get(0),
            )?;
            Ok(score)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the engagement score (already clamped by the scorer).
pub async fn set_engagement_score(
    db: &Database,
    id: &str,
    score: i64,
    now: DateTime<Utc>,
) -> Result<(), ChaserError> {
    let id = id.to_string();
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE recipients SET engagement_score = ?1, updated_at = ?2 WHERE id = ?3",
                params![score, now_ts, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
