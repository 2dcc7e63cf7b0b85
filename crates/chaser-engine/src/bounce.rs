// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounce and spam-complaint webhook handling.
//!
//! Provider webhooks are at-least-once, so every event is deduplicated
//! before any mutation. Hard bounces and complaints suspend the recipient
//! and cancel their pending queue; soft bounces only count until they
//! cross the configured threshold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use chaser_config::model::WebhookConfig;
use chaser_core::types::{BounceType, DeliveryEventType};
use chaser_core::ChaserError;
use chaser_storage::queries::{events, items, recipients, webhooks};
use chaser_storage::{Database, NewDeliveryEvent};

/// A normalized bounce/complaint notification from the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct BounceEvent {
    pub provider: String,
    /// Provider event id; preferred dedupe key when present.
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub provider_message_id: Option<String>,
    pub recipient_email: String,
    pub bounce_type: BounceType,
    #[serde(default)]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// How a webhook event was handled. Serialized into the HTTP response so
/// operators can see what a delivery did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum WebhookOutcome {
    /// Already seen; nothing changed.
    Duplicate,
    /// No matching recipient; acknowledged so the provider stops retrying.
    Unresolved,
    Processed { recipient_id: String, suspended: bool },
}

impl BounceEvent {
    fn dedupe_key(&self) -> String {
        match &self.event_id {
            Some(id) => format!("{}:{id}", self.provider),
            None => format!(
                "{}:{}:{}:{}",
                self.provider,
                self.recipient_email,
                self.timestamp.timestamp(),
                self.bounce_type
            ),
        }
    }
}

/// Process one bounce/complaint event.
pub async fn handle_bounce(
    db: &Database,
    config: &WebhookConfig,
    event: BounceEvent,
    now: DateTime<Utc>,
) -> Result<WebhookOutcome, ChaserError> {
    let key = event.dedupe_key();
    if !webhooks::try_record(db, &key, &event.provider, now).await? {
        info!(key = %key, "duplicate bounce event ignored");
        return Ok(WebhookOutcome::Duplicate);
    }

    // The key is recorded before any mutation so a concurrent duplicate
    // cannot slip through. If the mutations then fail, release it again
    // so the provider's retry is not swallowed as a duplicate.
    match apply_bounce(db, config, &event, now).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            if let Err(cleanup) = webhooks::release(db, &key).await {
                warn!(key = %key, error = %cleanup, "failed to release dedupe key");
            }
            Err(e)
        }
    }
}

async fn apply_bounce(
    db: &Database,
    config: &WebhookConfig,
    event: &BounceEvent,
    now: DateTime<Utc>,
) -> Result<WebhookOutcome, ChaserError> {
    let Some((item_id, recipient_id)) = resolve(db, event).await? else {
        warn!(email = %event.recipient_email, "bounce event did not resolve to a recipient");
        return Ok(WebhookOutcome::Unresolved);
    };

    let event_type = match event.bounce_type {
        BounceType::Complaint => DeliveryEventType::Complained,
        BounceType::Hard | BounceType::Soft => DeliveryEventType::Bounced,
    };
    events::append_event(
        db,
        NewDeliveryEvent {
            item_id,
            recipient_id: recipient_id.clone(),
            event_type,
            provider_message_id: event.provider_message_id.clone(),
            metadata: event.reason.clone(),
        },
        now,
    )
    .await?;

    let count =
        recipients::increment_bounce_count(db, &recipient_id, event.bounce_type, now).await?;

    let suspend = match event.bounce_type {
        BounceType::Hard | BounceType::Complaint => true,
        BounceType::Soft => count >= config.soft_bounce_threshold,
    };
    if suspend {
        recipients::suspend_recipient(db, &recipient_id, now).await?;
        let cancelled = items::cancel_queued_for_recipient(db, &recipient_id, now).await?;
        info!(
            recipient_id = %recipient_id,
            bounce_type = %event.bounce_type,
            cancelled,
            "recipient suspended"
        );
    }

    Ok(WebhookOutcome::Processed { recipient_id, suspended: suspend })
}

/// Resolve the event to `(item_id, recipient_id)`: by provider message id
/// when present, otherwise by recipient email with the most recent sent
/// item as a best-effort attribution.
async fn resolve(
    db: &Database,
    event: &BounceEvent,
) -> Result<Option<(Option<String>, String)>, ChaserError> {
    if let Some(pmid) = &event.provider_message_id
        && let Some((item_id, recipient_id)) = items::find_by_provider_message_id(db, pmid).await?
    {
        return Ok(Some((Some(item_id), recipient_id)));
    }
    let Some(recipient) = recipients::get_recipient_by_email(db, &event.recipient_email).await?
    else {
        return Ok(None);
    };
    let item_id = items::latest_sent_for_recipient(db, &recipient.id).await?;
    Ok(Some((item_id, recipient.id)))
}
