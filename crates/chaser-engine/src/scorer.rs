// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engagement scorer: a periodic batch over the delivery event log.
//!
//! The score is informational only. It never blocks delivery, and small
//! oscillations are not persisted: a write happens only when the
//! recomputed score moves by at least `scorer.min_delta`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use chaser_config::model::ScorerConfig;
use chaser_core::ChaserError;
use chaser_storage::queries::{events, recipients};
use chaser_storage::{Database, RecipientEventCounts};

/// Result of one scorer pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScorerSummary {
    /// Recipients with any events in the window.
    pub scanned: usize,
    /// Recipients whose persisted score changed.
    pub updated: usize,
}

/// Recompute engagement scores over the trailing window.
pub async fn run_scorer(
    db: &Database,
    config: &ScorerConfig,
    now: DateTime<Utc>,
) -> Result<ScorerSummary, ChaserError> {
    let since = now - Duration::days(i64::from(config.window_days));
    let counts = events::recipient_event_counts(db, since).await?;

    let mut summary = ScorerSummary { scanned: counts.len(), updated: 0 };
    for tally in counts {
        let Some(recipient) = recipients::get_recipient(db, &tally.recipient_id).await? else {
            continue;
        };
        let new_score = compute_score(&tally);
        let delta = (new_score - recipient.engagement_score).abs();
        if delta >= config.min_delta {
            recipients::set_engagement_score(db, &tally.recipient_id, new_score, now).await?;
            debug!(
                recipient_id = %tally.recipient_id,
                old = recipient.engagement_score,
                new = new_score,
                "score updated"
            );
            summary.updated += 1;
        }
    }

    info!(scanned = summary.scanned, updated = summary.updated, "scorer pass complete");
    Ok(summary)
}

/// Score one recipient's window tallies. Baseline 50, banded bonuses for
/// opens/clicks, flat bonuses for replies and clean delivery, penalties
/// per bounce and complaint, clamped to [0, 100].
fn compute_score(tally: &RecipientEventCounts) -> i64 {
    let mut score: i64 = 50;

    if tally.sent > 0 {
        let sent = tally.sent as f64;
        let open_rate = tally.opened as f64 / sent;
        let click_rate = tally.clicked as f64 / sent;
        let delivery_rate = tally.delivered as f64 / sent;

        if open_rate > 0.25 {
            score += 20;
        } else if open_rate > 0.10 {
            score += 10;
        }
        if click_rate > 0.10 {
            score += 25;
        } else if click_rate > 0.05 {
            score += 10;
        }
        if delivery_rate >= 0.95 {
            score += 10;
        }
    }

    if tally.replied > 0 {
        score += 30;
    }
    score -= 15 * tally.bounced;
    score -= 30 * tally.complained;

    score.clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaser_core::types::DeliveryEventType;
    use chaser_storage::NewDeliveryEvent;
    use chaser_test_utils::{seed_recipient, temp_db, test_now};

    fn tally(
        sent: i64,
        delivered: i64,
        opened: i64,
        clicked: i64,
        replied: i64,
        bounced: i64,
        complained: i64,
    ) -> RecipientEventCounts {
        RecipientEventCounts {
            recipient_id: "r-1".into(),
            sent,
            delivered,
            opened,
            clicked,
            replied,
            bounced,
            complained,
        }
    }

    #[test]
    fn quiet_recipient_stays_at_baseline() {
        assert_eq!(compute_score(&tally(0, 0, 0, 0, 0, 0, 0)), 50);
    }

    #[test]
    fn highly_engaged_recipient_hits_the_cap() {
        // 10 sent, all delivered, 5 opened, 3 clicked, 1 reply:
        // 50 + 20 + 25 + 10 + 30 = 135 -> clamped to 100.
        assert_eq!(compute_score(&tally(10, 10, 5, 3, 1, 0, 0)), 100);
    }

    #[test]
    fn open_and_click_bands() {
        // 20% opens: +10 only. 50 + 10 + 10 (delivery) = 70.
        assert_eq!(compute_score(&tally(10, 10, 2, 0, 0, 0, 0)), 70);
        // 8% clicks on 100 sends: +10 clicks, +10 opens (8% < 10% so none).
        assert_eq!(compute_score(&tally(100, 100, 0, 8, 0, 0, 0)), 70);
    }

    #[test]
    fn bounces_and_complaints_drag_the_score_down() {
        // 50 - 15*2 - 30 = -10 -> clamped to 0.
        assert_eq!(compute_score(&tally(0, 0, 0, 0, 0, 2, 1)), 0);
        // One bounce on an otherwise clean record: 50 + 10 - 15 = 45.
        assert_eq!(compute_score(&tally(10, 10, 0, 0, 0, 1, 0)), 45);
    }

    #[tokio::test]
    async fn persists_only_when_delta_reaches_threshold() {
        let (db, _dir) = temp_db().await;
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;

        // One sent+delivered event: score would be 50 + 10 = 60, delta 10.
        for event_type in [DeliveryEventType::Sent, DeliveryEventType::Delivered] {
            events::append_event(
                &db,
                NewDeliveryEvent {
                    item_id: None,
                    recipient_id: "r-1".into(),
                    event_type,
                    provider_message_id: None,
                    metadata: None,
                },
                now,
            )
            .await
            .unwrap();
        }

        let config = ScorerConfig { window_days: 30, min_delta: 15 };
        let summary = run_scorer(&db, &config, now).await.unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.updated, 0);
        let r = recipients::get_recipient(&db, "r-1").await.unwrap().unwrap();
        assert_eq!(r.engagement_score, 50);

        let config = ScorerConfig { window_days: 30, min_delta: 5 };
        let summary = run_scorer(&db, &config, now).await.unwrap();
        assert_eq!(summary.updated, 1);
        let r = recipients::get_recipient(&db, "r-1").await.unwrap().unwrap();
        assert_eq!(r.engagement_score, 60);
    }

    #[tokio::test]
    async fn events_outside_the_window_are_ignored() {
        let (db, _dir) = temp_db().await;
        let now = test_now();
        seed_recipient(&db, "r-1", "ada@example.com").await;

        events::append_event(
            &db,
            NewDeliveryEvent {
                item_id: None,
                recipient_id: "r-1".into(),
                event_type: DeliveryEventType::Complained,
                provider_message_id: None,
                metadata: None,
            },
            now - Duration::days(60),
        )
        .await
        .unwrap();

        let summary = run_scorer(&db, &ScorerConfig::default(), now).await.unwrap();
        assert_eq!(summary.scanned, 0);
        assert_eq!(summary.updated, 0);
    }
}
