// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduling request intake.
//!
//! The single entry point for creating followup items, and the only place
//! outside the queue processor that invokes the recurrence calculator.
//! Content is opaque text (often AI-generated upstream); the only
//! validation applied here is non-emptiness and the configured length caps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use chaser_config::model::{EngineConfig, QueueConfig};
use chaser_core::types::{FollowupItem, FollowupStatus, RecurrencePattern, RecurrenceType};
use chaser_core::ChaserError;
use chaser_storage::queries::{items, recipients};
use chaser_storage::Database;

/// When the first send should happen.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ScheduleSpec {
    /// As soon as the next processor batch runs.
    Immediate,
    /// At a fixed time, used as-is.
    At { at: DateTime<Utc> },
    /// Per a recurrence pattern; the first occurrence comes from the
    /// calculator.
    Recurring { pattern: RecurrencePattern },
}

/// An operator or application request to schedule a followup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FollowupRequest {
    pub owner_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub sequence_id: Option<String>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub tone: Option<String>,
    pub schedule: ScheduleSpec,
    #[serde(default)]
    pub pause_on_reply: bool,
    #[serde(default)]
    pub cancel_if_paid: bool,
    /// Overrides `queue.default_max_retries` when set.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// Validate a request and insert the resulting `queued` item.
pub async fn schedule_followup(
    db: &Database,
    engine: &EngineConfig,
    queue: &QueueConfig,
    request: FollowupRequest,
    now: DateTime<Utc>,
) -> Result<FollowupItem, ChaserError> {
    if request.subject.trim().is_empty() {
        return Err(ChaserError::Validation("subject must not be empty".into()));
    }
    if request.body.trim().is_empty() {
        return Err(ChaserError::Validation("body must not be empty".into()));
    }
    if request.subject.chars().count() > engine.subject_max_len {
        return Err(ChaserError::Validation(format!(
            "subject exceeds {} characters",
            engine.subject_max_len
        )));
    }
    if request.body.chars().count() > engine.body_max_len {
        return Err(ChaserError::Validation(format!(
            "body exceeds {} characters",
            engine.body_max_len
        )));
    }
    let Some(recipient) = recipients::get_recipient(db, &request.recipient_id).await? else {
        return Err(ChaserError::Validation(format!(
            "unknown recipient `{}`",
            request.recipient_id
        )));
    };
    // Suspension is sticky: nothing new is ever queued for a suspended
    // recipient, so refuse the request outright.
    if recipient.unsubscribed {
        return Err(ChaserError::Validation(format!(
            "recipient `{}` is suspended",
            request.recipient_id
        )));
    }

    let (scheduled_at, recurrence) = match &request.schedule {
        // Immediate sends still flow through the queue: route through the
        // calculator's `once` path rather than special-casing them.
        ScheduleSpec::Immediate => {
            let pattern = RecurrencePattern {
                recurrence_type: RecurrenceType::Once,
                interval: 1,
                time_of_day: now.format("%H:%M").to_string(),
                days_of_week: None,
                end_after_count: None,
                end_date: None,
            };
            (chaser_schedule::next_run(&pattern, now)?, None)
        }
        ScheduleSpec::At { at } => (*at, None),
        ScheduleSpec::Recurring { pattern } => {
            (chaser_schedule::next_run(pattern, now)?, Some(pattern.clone()))
        }
    };

    let item = FollowupItem {
        id: Uuid::new_v4().to_string(),
        owner_id: request.owner_id,
        recipient_id: request.recipient_id,
        invoice_id: request.invoice_id,
        sequence_id: request.sequence_id,
        subject: request.subject,
        body: request.body,
        tone: request.tone,
        channel: "email".to_string(),
        status: FollowupStatus::Queued,
        scheduled_at: Some(scheduled_at),
        sent_at: None,
        retry_count: 0,
        max_retries: request.max_retries.unwrap_or(queue.default_max_retries),
        pause_on_reply: request.pause_on_reply,
        cancel_if_paid: request.cancel_if_paid,
        recurrence,
        occurrence: 1,
        locked_until: None,
        provider_message_id: None,
        created_at: now,
        updated_at: now,
    };
    items::insert_item(db, &item).await?;
    info!(item_id = %item.id, scheduled_at = %scheduled_at, "followup scheduled");
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaser_test_utils::{seed_recipient, temp_db, test_now};
    use chrono::Duration;

    fn request(recipient_id: &str, schedule: ScheduleSpec) -> FollowupRequest {
        FollowupRequest {
            owner_id: "owner-1".into(),
            recipient_id: recipient_id.into(),
            invoice_id: None,
            sequence_id: None,
            subject: "Invoice reminder".into(),
            body: "Hi {{client_name}}".into(),
            tone: None,
            schedule,
            pause_on_reply: true,
            cancel_if_paid: false,
            max_retries: None,
        }
    }

    #[tokio::test]
    async fn immediate_request_queues_one_minute_out() {
        let (db, _dir) = temp_db().await;
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;

        let item = schedule_followup(
            &db,
            &EngineConfig::default(),
            &QueueConfig::default(),
            request("r-1", ScheduleSpec::Immediate),
            now,
        )
        .await
        .unwrap();

        assert_eq!(item.status, FollowupStatus::Queued);
        assert_eq!(item.scheduled_at, Some(now + Duration::minutes(1)));
        assert_eq!(item.occurrence, 1);
        assert_eq!(item.max_retries, 3);
        assert!(items::get_item(&db, &item.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn fixed_time_is_used_as_is() {
        let (db, _dir) = temp_db().await;
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;

        let at = now + Duration::days(3);
        let item = schedule_followup(
            &db,
            &EngineConfig::default(),
            &QueueConfig::default(),
            request("r-1", ScheduleSpec::At { at }),
            now,
        )
        .await
        .unwrap();
        assert_eq!(item.scheduled_at, Some(at));
        assert!(item.recurrence.is_none());
    }

    #[tokio::test]
    async fn recurring_request_stores_pattern_and_first_run() {
        let (db, _dir) = temp_db().await;
        let now = test_now(); // Monday 2026-03-02 12:00 UTC
        seed_recipient(&db, "r-1", "ada@example.com").await;

        let pattern = RecurrencePattern {
            recurrence_type: RecurrenceType::Daily,
            interval: 1,
            time_of_day: "09:00".into(),
            days_of_week: None,
            end_after_count: Some(4),
            end_date: None,
        };
        let item = schedule_followup(
            &db,
            &EngineConfig::default(),
            &QueueConfig::default(),
            request("r-1", ScheduleSpec::Recurring { pattern: pattern.clone() }),
            now,
        )
        .await
        .unwrap();

        // 09:00 already passed today, so the first run is tomorrow.
        assert_eq!(
            item.scheduled_at.unwrap().to_rfc3339(),
            "2026-03-03T09:00:00+00:00"
        );
        assert_eq!(item.recurrence, Some(pattern));
    }

    #[tokio::test]
    async fn content_validation_rejects_bad_requests() {
        let (db, _dir) = temp_db().await;
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        let engine = EngineConfig::default();
        let queue = QueueConfig::default();

        let mut empty_body = request("r-1", ScheduleSpec::Immediate);
        empty_body.body = "   ".into();
        assert!(matches!(
            schedule_followup(&db, &engine, &queue, empty_body, now).await,
            Err(ChaserError::Validation(_))
        ));

        let mut long_subject = request("r-1", ScheduleSpec::Immediate);
        long_subject.subject = "x".repeat(engine.subject_max_len + 1);
        assert!(matches!(
            schedule_followup(&db, &engine, &queue, long_subject, now).await,
            Err(ChaserError::Validation(_))
        ));

        let unknown = request("r-missing", ScheduleSpec::Immediate);
        assert!(matches!(
            schedule_followup(&db, &engine, &queue, unknown, now).await,
            Err(ChaserError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn suspended_recipient_is_refused() {
        let (db, _dir) = temp_db().await;
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        recipients::suspend_recipient(&db, "r-1", now).await.unwrap();

        let result = schedule_followup(
            &db,
            &EngineConfig::default(),
            &QueueConfig::default(),
            request("r-1", ScheduleSpec::Immediate),
            now,
        )
        .await;
        assert!(matches!(result, Err(ChaserError::Validation(_))));

        // Nothing was queued for the suspended recipient.
        let queued: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM followup_items WHERE recipient_id = 'r-1'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(queued, 0);
    }
}
