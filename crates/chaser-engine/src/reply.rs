// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound reply webhook handling.
//!
//! A reply is an engagement signal: it advances `last_reply_at`
//! monotonically, eagerly pauses the recipient's reply-guarded queue, and
//! nudges the engagement score up.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use chaser_core::types::DeliveryEventType;
use chaser_core::ChaserError;
use chaser_storage::queries::{events, items, recipients, webhooks};
use chaser_storage::{Database, NewDeliveryEvent};

use crate::bounce::WebhookOutcome;

/// A normalized inbound-reply notification.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyEvent {
    pub provider: String,
    #[serde(default)]
    pub event_id: Option<String>,
    pub from_email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ReplyEvent {
    fn dedupe_key(&self) -> String {
        match &self.event_id {
            Some(id) => format!("{}:{id}", self.provider),
            None => format!(
                "{}:{}:{}:reply",
                self.provider,
                self.from_email,
                self.timestamp.timestamp()
            ),
        }
    }
}

/// Process one reply event.
pub async fn handle_reply(
    db: &Database,
    event: ReplyEvent,
    now: DateTime<Utc>,
) -> Result<WebhookOutcome, ChaserError> {
    let key = event.dedupe_key();
    if !webhooks::try_record(db, &key, &event.provider, now).await? {
        info!(key = %key, "duplicate reply event ignored");
        return Ok(WebhookOutcome::Duplicate);
    }

    // Same ordering as bounce handling: record first, release on failure
    // so the provider's retry is not treated as a duplicate.
    match apply_reply(db, &event, now).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            if let Err(cleanup) = webhooks::release(db, &key).await {
                warn!(key = %key, error = %cleanup, "failed to release dedupe key");
            }
            Err(e)
        }
    }
}

async fn apply_reply(
    db: &Database,
    event: &ReplyEvent,
    now: DateTime<Utc>,
) -> Result<WebhookOutcome, ChaserError> {
    let Some(recipient) = recipients::get_recipient_by_email(db, &event.from_email).await? else {
        warn!(email = %event.from_email, "reply event did not resolve to a recipient");
        return Ok(WebhookOutcome::Unresolved);
    };

    let item_id = items::latest_sent_for_recipient(db, &recipient.id).await?;
    events::append_event(
        db,
        NewDeliveryEvent {
            item_id,
            recipient_id: recipient.id.clone(),
            event_type: DeliveryEventType::Replied,
            provider_message_id: None,
            metadata: event.subject.clone(),
        },
        now,
    )
    .await?;

    recipients::touch_last_reply(db, &recipient.id, event.timestamp, now).await?;
    let paused = items::pause_queued_with_reply_guard(db, &recipient.id, now).await?;
    let score = recipients::add_engagement(db, &recipient.id, 10, now).await?;
    info!(recipient_id = %recipient.id, paused, score, "reply processed");

    Ok(WebhookOutcome::Processed { recipient_id: recipient.id, suspended: false })
}
