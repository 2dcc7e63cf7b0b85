// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only delivery event log.

use chrono::{DateTime, Utc};
use rusqlite::params;

use chaser_core::types::{DeliveryEvent, DeliveryEventType};
use chaser_core::ChaserError;

use crate::database::{map_tr_err, parse_ts, to_ts, Database};
use crate::models::{NewDeliveryEvent, RecipientEventCounts};

/// Append a delivery event. Events are never updated or deleted.
pub async fn append_event(
    db: &Database,
    event: NewDeliveryEvent,
    now: DateTime<Utc>,
) -> Result<i64, ChaserError> {
    let now_ts = to_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO delivery_events
                     (item_id, recipient_id, event_type, provider_message_id, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.item_id,
                    event.recipient_id,
                    event.event_type.to_string(),
                    event.provider_message_id,
                    event.metadata,
                    now_ts,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// List events for a recipient, oldest first.
pub async fn events_for_recipient(
    db: &Database,
    recipient_id: &str,
) -> Result<Vec<DeliveryEvent>, ChaserError> {
    let recipient_id = recipient_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, item_id, recipient_id, event_type, provider_message_id, metadata,
                        created_at
                 FROM delivery_events WHERE recipient_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![recipient_id], |row| {
                use std::str::FromStr;
                let type_str: String = row.get(3)?;
                let event_type = DeliveryEventType::from_str(&type_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(DeliveryEvent {
                    id: row.get(0)?,
                    item_id: row.get(1)?,
                    recipient_id: row.get(2)?,
                    event_type,
                    provider_message_id: row.get(4)?,
                    metadata: row.get(5)?,
                    created_at: parse_ts(6, &row.get::<_, String>(6)?)?,
                })
            })?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(map_tr_err)
}

/// Tally events per recipient since `since`, one row per recipient that
/// has any events in the window.
pub async fn recipient_event_counts(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<Vec<RecipientEventCounts>, ChaserError> {
    let since_ts = to_ts(since);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT recipient_id,
                        SUM(CASE WHEN event_type = 'sent' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN event_type = 'delivered' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN event_type = 'opened' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN event_type = 'clicked' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN event_type = 'replied' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN event_type = 'bounced' THEN 1 ELSE 0 END),
                        SUM(CASE WHEN event_type = 'complained' THEN 1 ELSE 0 END)
                 FROM delivery_events
                 WHERE created_at >= ?1
                 GROUP BY recipient_id",
            )?;
            let rows = stmt.query_map(params![since_ts], |row| {
                Ok(RecipientEventCounts {
                    recipient_id: row.get(0)?,
                    sent: row.get(1)?,
                    delivered: row.get(2)?,
                    opened: row.get(3)?,
                    clicked: row.get(4)?,
                    replied: row.get(5)?,
                    bounced: row.get(6)?,
                    complained: row.get(7)?,
                })
            })?;
            let mut counts = Vec::new();
            for row in rows {
                counts.push(row?);
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}
