// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue processor: one invocation drains one bounded batch of due
//! followups.
//!
//! Each batch recovers stale claims, atomically claims due items, applies
//! the skip/cancel guards in a fixed order, delivers what remains, and
//! records the resulting transitions. An error on one item never aborts
//! the rest of the batch.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use chaser_config::model::QueueConfig;
use chaser_core::types::{DeliveryEventType, FollowupItem, FollowupStatus, INVOICE_STATUS_PAID};
use chaser_core::ChaserError;
use chaser_delivery::{Deliverer, DeliveryOutcome};
use chaser_storage::queries::{events, items};
use chaser_storage::{Database, DueItem, NewDeliveryEvent};

/// Counters for one processor batch, returned to the caller as JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Stale `sending` claims returned to `queued` before claiming.
    pub recovered: u64,
    pub claimed: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub paused: usize,
    /// Items returned to `queued` by pre-delivery validation.
    pub skipped: usize,
    /// Items whose processing hit a storage or internal error.
    pub errors: usize,
}

/// How one claimed item was resolved. Internal bookkeeping for the summary.
enum ItemResolution {
    Sent,
    Retried,
    Failed,
    Cancelled,
    Paused,
    Skipped,
}

/// Drives delivery of due followup items.
pub struct QueueProcessor {
    db: Arc<Database>,
    deliverer: Deliverer,
    config: QueueConfig,
}

impl QueueProcessor {
    pub fn new(db: Arc<Database>, deliverer: Deliverer, config: QueueConfig) -> Self {
        Self { db, deliverer, config }
    }

    /// Run one batch: recover, claim, guard, deliver, transition.
    pub async fn run_batch(&self, now: DateTime<Utc>) -> Result<BatchSummary, ChaserError> {
        let mut summary = BatchSummary::default();

        summary.recovered = items::recover_stale(&self.db, now).await?;
        if summary.recovered > 0 {
            warn!(recovered = summary.recovered, "recovered stale claims");
        }

        let claimed = items::claim_due(
            &self.db,
            now,
            self.config.batch_size,
            self.config.claim_lock_minutes,
        )
        .await?;
        summary.claimed = claimed.len();
        debug!(claimed = summary.claimed, "claimed due items");

        for due in claimed {
            let item_id = due.item.id.clone();
            match self.process_item(due, now).await {
                Ok(ItemResolution::Sent) => summary.sent += 1,
                Ok(ItemResolution::Retried) => summary.retried += 1,
                Ok(ItemResolution::Failed) => summary.failed += 1,
                Ok(ItemResolution::Cancelled) => summary.cancelled += 1,
                Ok(ItemResolution::Paused) => summary.paused += 1,
                Ok(ItemResolution::Skipped) => summary.skipped += 1,
                Err(e) => {
                    // The claim stays in `sending`; a later batch recovers
                    // it once the lock expires.
                    error!(item_id = %item_id, error = %e, "item processing failed");
                    summary.errors += 1;
                }
            }
        }

        info!(
            sent = summary.sent,
            retried = summary.retried,
            failed = summary.failed,
            cancelled = summary.cancelled,
            paused = summary.paused,
            skipped = summary.skipped,
            errors = summary.errors,
            "batch complete"
        );
        Ok(summary)
    }

    async fn process_item(
        &self,
        due: DueItem,
        now: DateTime<Utc>,
    ) -> Result<ItemResolution, ChaserError> {
        let DueItem { item, recipient, invoice_status } = due;

        // Guards, first match wins. None of these count as a delivery
        // attempt.
        if recipient.unsubscribed {
            items::finish_claim(&self.db, &item.id, FollowupStatus::Cancelled, now).await?;
            debug!(item_id = %item.id, "cancelled: recipient unsubscribed");
            return Ok(ItemResolution::Cancelled);
        }
        if recipient.followups_paused {
            items::finish_claim(&self.db, &item.id, FollowupStatus::Paused, now).await?;
            debug!(item_id = %item.id, "paused: recipient followups paused");
            return Ok(ItemResolution::Paused);
        }
        if item.pause_on_reply
            && let (Some(replied), Some(scheduled)) = (recipient.last_reply_at, item.scheduled_at)
            && replied > scheduled
        {
            items::finish_claim(&self.db, &item.id, FollowupStatus::Paused, now).await?;
            debug!(item_id = %item.id, "paused: recipient replied after scheduling");
            return Ok(ItemResolution::Paused);
        }
        if item.cancel_if_paid && invoice_status.as_deref() == Some(INVOICE_STATUS_PAID) {
            items::finish_claim(&self.db, &item.id, FollowupStatus::Cancelled, now).await?;
            debug!(item_id = %item.id, "cancelled: invoice paid");
            return Ok(ItemResolution::Cancelled);
        }

        // Pre-delivery validation. A skip is not an attempt: the item goes
        // back to `queued` untouched.
        if recipient.email.trim().is_empty() || item.body.trim().is_empty() {
            warn!(item_id = %item.id, "skipped: missing recipient email or empty body");
            items::release_claim(&self.db, &item.id, now).await?;
            return Ok(ItemResolution::Skipped);
        }

        match self.deliverer.deliver(&item, &recipient).await {
            DeliveryOutcome::Delivered { provider_message_id } => {
                items::mark_sent(&self.db, &item.id, now, provider_message_id.clone()).await?;
                events::append_event(
                    &self.db,
                    NewDeliveryEvent {
                        item_id: Some(item.id.clone()),
                        recipient_id: item.recipient_id.clone(),
                        event_type: DeliveryEventType::Sent,
                        provider_message_id,
                        metadata: None,
                    },
                    now,
                )
                .await?;
                self.spawn_next_occurrence(&item, now).await?;
                Ok(ItemResolution::Sent)
            }
            DeliveryOutcome::Failed { transient: false, detail } => {
                warn!(item_id = %item.id, detail = %detail, "permanent failure");
                items::finish_claim(&self.db, &item.id, FollowupStatus::Failed, now).await?;
                Ok(ItemResolution::Failed)
            }
            DeliveryOutcome::Failed { transient: true, detail } => {
                let next_retry = item.retry_count + 1;
                if next_retry > item.max_retries {
                    warn!(item_id = %item.id, detail = %detail, "retry budget exhausted");
                    items::finish_claim(&self.db, &item.id, FollowupStatus::Failed, now).await?;
                    return Ok(ItemResolution::Failed);
                }
                // Exponential backoff: 2, 4, 8, ... minutes.
                let delay = Duration::minutes(2i64.pow(next_retry.min(30)));
                let next_at = now + delay;
                debug!(item_id = %item.id, retry = next_retry, next_at = %next_at, "retry scheduled");
                items::schedule_retry(&self.db, &item.id, next_retry, next_at, now).await?;
                Ok(ItemResolution::Retried)
            }
        }
    }

    /// After a successful send of a recurring item, enqueue the next
    /// occurrence as a brand-new row unless the series has ended.
    async fn spawn_next_occurrence(
        &self,
        item: &FollowupItem,
        now: DateTime<Utc>,
    ) -> Result<(), ChaserError> {
        let Some(pattern) = &item.recurrence else {
            return Ok(());
        };

        let next_at = chaser_schedule::next_run(pattern, now)?;
        let next_occurrence = item.occurrence + 1;
        if chaser_schedule::series_exhausted(pattern, next_occurrence, next_at) {
            debug!(item_id = %item.id, occurrence = item.occurrence, "series exhausted");
            return Ok(());
        }

        let next = FollowupItem {
            id: Uuid::new_v4().to_string(),
            status: FollowupStatus::Queued,
            scheduled_at: Some(next_at),
            sent_at: None,
            retry_count: 0,
            occurrence: next_occurrence,
            locked_until: None,
            provider_message_id: None,
            created_at: now,
            updated_at: now,
            ..item.clone()
        };
        debug!(item_id = %item.id, next_id = %next.id, next_at = %next_at, "spawned next occurrence");
        items::insert_item(&self.db, &next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaser_core::types::{RecurrencePattern, RecurrenceType};
    use chaser_storage::queries::{invoices, recipients};
    use chaser_test_utils::{seed_item, seed_recipient, temp_db, test_now, FakeTransport, ScriptedSend};

    fn processor(db: Arc<Database>, transport: Arc<FakeTransport>) -> QueueProcessor {
        let deliverer = Deliverer::new(transport, "Acme".into(), true, true);
        QueueProcessor::new(db, deliverer, QueueConfig::default())
    }

    #[tokio::test]
    async fn successful_batch_marks_sent_and_logs_event() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        seed_item(&db, "f-1", "r-1", now - Duration::minutes(1)).await;

        let transport = Arc::new(FakeTransport::with_script(vec![ScriptedSend::Ok {
            provider_message_id: Some("pm-1".into()),
        }]));
        let summary = processor(db.clone(), transport.clone())
            .run_batch(now)
            .await
            .unwrap();

        assert_eq!(summary.claimed, 1);
        assert_eq!(summary.sent, 1);

        let item = items::get_item(&db, "f-1").await.unwrap().unwrap();
        assert_eq!(item.status, FollowupStatus::Sent);
        assert_eq!(item.sent_at, Some(now));
        assert_eq!(item.provider_message_id.as_deref(), Some("pm-1"));

        let logged = events::events_for_recipient(&db, "r-1").await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].event_type, DeliveryEventType::Sent);
        assert_eq!(logged[0].item_id.as_deref(), Some("f-1"));
    }

    #[tokio::test]
    async fn overlapping_batches_never_double_send() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        seed_item(&db, "f-1", "r-1", now - Duration::minutes(1)).await;

        let transport = Arc::new(FakeTransport::new());
        let p = processor(db.clone(), transport.clone());
        let first = p.run_batch(now).await.unwrap();
        let second = p.run_batch(now).await.unwrap();

        assert_eq!(first.sent, 1);
        assert_eq!(second.claimed, 0);
        assert_eq!(transport.send_count().await, 1);
    }

    #[tokio::test]
    async fn guard_order_without_delivery_attempts() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now();

        // Unsubscribed wins over paused.
        seed_recipient(&db, "r-1", "ada@example.com").await;
        recipients::suspend_recipient(&db, "r-1", now).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("UPDATE recipients SET followups_paused = 1 WHERE id = 'r-1'", [])?;
                Ok(())
            })
            .await
            .unwrap();
        seed_item(&db, "f-1", "r-1", now - Duration::minutes(1)).await;

        // Paused recipient.
        seed_recipient(&db, "r-2", "bob@example.com").await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("UPDATE recipients SET followups_paused = 1 WHERE id = 'r-2'", [])?;
                Ok(())
            })
            .await
            .unwrap();
        seed_item(&db, "f-2", "r-2", now - Duration::minutes(1)).await;

        // Paid invoice with the cancel-if-paid guard.
        seed_recipient(&db, "r-3", "eve@example.com").await;
        invoices::upsert_invoice(&db, "inv-1", "r-3", "paid", 10_000, "USD")
            .await
            .unwrap();
        seed_item(&db, "f-3", "r-3", now - Duration::minutes(1)).await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE followup_items SET invoice_id = 'inv-1', cancel_if_paid = 1 WHERE id = 'f-3'",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::new());
        let summary = processor(db.clone(), transport.clone())
            .run_batch(now)
            .await
            .unwrap();

        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.paused, 1);
        assert_eq!(summary.sent, 0);
        // No guard outcome reached the transport.
        assert_eq!(transport.send_count().await, 0);

        assert_eq!(
            items::get_item(&db, "f-1").await.unwrap().unwrap().status,
            FollowupStatus::Cancelled
        );
        assert_eq!(
            items::get_item(&db, "f-2").await.unwrap().unwrap().status,
            FollowupStatus::Paused
        );
        assert_eq!(
            items::get_item(&db, "f-3").await.unwrap().unwrap().status,
            FollowupStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn pause_on_reply_guard_compares_against_scheduled_at() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        recipients::touch_last_reply(&db, "r-1", now - Duration::minutes(30), now)
            .await
            .unwrap();

        // Scheduled before the reply arrived: pauses.
        seed_item(&db, "f-1", "r-1", now - Duration::hours(1)).await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("UPDATE followup_items SET pause_on_reply = 1 WHERE id = 'f-1'", [])?;
                Ok(())
            })
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::new());
        let summary = processor(db.clone(), transport.clone())
            .run_batch(now)
            .await
            .unwrap();
        assert_eq!(summary.paused, 1);
        assert_eq!(transport.send_count().await, 0);
    }

    #[tokio::test]
    async fn transient_failures_back_off_exponentially_then_fail() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let mut now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        seed_item(&db, "f-1", "r-1", now - Duration::minutes(1)).await;

        let transport = Arc::new(FakeTransport::with_script(vec![
            ScriptedSend::Transient { detail: "429".into() },
            ScriptedSend::Transient { detail: "503".into() },
            ScriptedSend::Transient { detail: "503".into() },
            ScriptedSend::Transient { detail: "timeout".into() },
        ]));
        let p = processor(db.clone(), transport.clone());

        // Backoff schedule: 2, 4, 8 minutes for retries 1-3.
        for expected_delay in [2i64, 4, 8] {
            let summary = p.run_batch(now).await.unwrap();
            assert_eq!(summary.retried, 1, "delay {expected_delay}");
            let item = items::get_item(&db, "f-1").await.unwrap().unwrap();
            assert_eq!(item.status, FollowupStatus::Queued);
            assert_eq!(
                item.scheduled_at,
                Some(now + Duration::minutes(expected_delay))
            );
            now += Duration::minutes(expected_delay);
        }

        // Fourth transient failure exceeds max_retries = 3: terminal.
        let summary = p.run_batch(now).await.unwrap();
        assert_eq!(summary.failed, 1);
        let item = items::get_item(&db, "f-1").await.unwrap().unwrap();
        assert_eq!(item.status, FollowupStatus::Failed);
        assert!(item.retry_count <= item.max_retries);
    }

    #[tokio::test]
    async fn permanent_failure_is_immediately_terminal() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        seed_item(&db, "f-1", "r-1", now - Duration::minutes(1)).await;

        let transport = Arc::new(FakeTransport::with_script(vec![ScriptedSend::Permanent {
            detail: "422 bad address".into(),
        }]));
        let summary = processor(db.clone(), transport).run_batch(now).await.unwrap();

        assert_eq!(summary.failed, 1);
        let item = items::get_item(&db, "f-1").await.unwrap().unwrap();
        assert_eq!(item.status, FollowupStatus::Failed);
        assert_eq!(item.retry_count, 0);
    }

    #[tokio::test]
    async fn empty_body_is_skipped_not_attempted() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        seed_item(&db, "f-1", "r-1", now - Duration::minutes(1)).await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("UPDATE followup_items SET body = '  ' WHERE id = 'f-1'", [])?;
                Ok(())
            })
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::new());
        let summary = processor(db.clone(), transport.clone())
            .run_batch(now)
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(transport.send_count().await, 0);
        let item = items::get_item(&db, "f-1").await.unwrap().unwrap();
        assert_eq!(item.status, FollowupStatus::Queued);
        assert_eq!(item.retry_count, 0);
    }

    #[tokio::test]
    async fn recurring_send_spawns_next_occurrence() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now(); // 12:00 UTC
        seed_recipient(&db, "r-1", "ada@example.com").await;
        seed_item(&db, "f-1", "r-1", now - Duration::minutes(1)).await;

        let pattern = RecurrencePattern {
            recurrence_type: RecurrenceType::Daily,
            interval: 1,
            time_of_day: "09:00".into(),
            days_of_week: None,
            end_after_count: Some(2),
            end_date: None,
        };
        let json = serde_json::to_string(&pattern).unwrap();
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE followup_items SET recurrence = ?1 WHERE id = 'f-1'",
                    [json],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::new());
        let summary = processor(db.clone(), transport).run_batch(now).await.unwrap();
        assert_eq!(summary.sent, 1);

        // A second queued row exists for tomorrow 09:00 with occurrence 2.
        let (count, occurrence, scheduled): (i64, u32, String) = db
            .connection()
            .call(|conn| -> Result<(i64, u32, String), rusqlite::Error> {
                let row = conn.query_row(
                    "SELECT COUNT(*),
                            MAX(occurrence),
                            MAX(scheduled_at)
                     FROM followup_items WHERE status = 'queued'",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;
                Ok(row)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(occurrence, 2);
        assert!(scheduled.starts_with("2026-03-03T09:00"));
    }

    #[tokio::test]
    async fn exhausted_series_spawns_nothing() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        seed_item(&db, "f-1", "r-1", now - Duration::minutes(1)).await;

        let pattern = RecurrencePattern {
            recurrence_type: RecurrenceType::Daily,
            interval: 1,
            time_of_day: "09:00".into(),
            days_of_week: None,
            end_after_count: Some(1),
            end_date: None,
        };
        let json = serde_json::to_string(&pattern).unwrap();
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE followup_items SET recurrence = ?1 WHERE id = 'f-1'",
                    [json],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::new());
        processor(db.clone(), transport).run_batch(now).await.unwrap();

        let queued: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM followup_items WHERE status = 'queued'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(queued, 0);
    }

    #[tokio::test]
    async fn stale_claims_are_recovered_before_claiming() {
        let (db, _dir) = temp_db().await;
        let db = Arc::new(db);
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;
        seed_item(&db, "f-1", "r-1", now - Duration::hours(1)).await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE followup_items
                     SET status = 'sending', locked_until = '2026-03-02T11:00:00.000Z'
                     WHERE id = 'f-1'",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::new());
        let summary = processor(db.clone(), transport).run_batch(now).await.unwrap();
        assert_eq!(summary.recovered, 1);
        assert_eq!(summary.sent, 1);
    }
}
