// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database seeding helpers shared by integration tests.

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use chaser_core::types::{FollowupItem, FollowupStatus, Recipient};
use chaser_storage::queries::{items, recipients};
use chaser_storage::Database;

/// A fixed "now" used across fixtures so tests are deterministic.
pub fn test_now() -> DateTime<Utc> {
    "2026-03-02T12:00:00Z".parse().expect("valid timestamp")
}

/// Open a migrated database in a fresh temp directory. Keep the `TempDir`
/// alive for the duration of the test.
pub async fn temp_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("chaser-test.db");
    let db = Database::open(path.to_str().expect("utf-8 path"))
        .await
        .expect("open test database");
    (db, dir)
}

/// Insert a recipient with sane defaults and return it.
pub async fn seed_recipient(db: &Database, id: &str, email: &str) -> Recipient {
    let recipient = Recipient {
        id: id.to_string(),
        email: email.to_string(),
        name: Some("Ada".to_string()),
        unsubscribed: false,
        followups_paused: false,
        last_reply_at: None,
        engagement_score: 50,
        soft_bounce_count: 0,
        hard_bounce_count: 0,
        complaint_count: 0,
        created_at: test_now(),
        updated_at: test_now(),
    };
    recipients::insert_recipient(db, &recipient)
        .await
        .expect("insert recipient");
    recipient
}

/// Insert a queued followup item due at `scheduled_at` and return it.
pub async fn seed_item(
    db: &Database,
    id: &str,
    recipient_id: &str,
    scheduled_at: DateTime<Utc>,
) -> FollowupItem {
    let item = FollowupItem {
        id: id.to_string(),
        owner_id: "owner-1".to_string(),
        recipient_id: recipient_id.to_string(),
        invoice_id: None,
        sequence_id: None,
        subject: "Invoice reminder".to_string(),
        body: "Hi {{client_name}}, a gentle nudge about your invoice.".to_string(),
        tone: Some("friendly".to_string()),
        channel: "email".to_string(),
        status: FollowupStatus::Queued,
        scheduled_at: Some(scheduled_at),
        sent_at: None,
        retry_count: 0,
        max_retries: 3,
        pause_on_reply: false,
        cancel_if_paid: false,
        recurrence: None,
        occurrence: 1,
        locked_until: None,
        provider_message_id: None,
        created_at: test_now(),
        updated_at: test_now(),
    };
    items::insert_item(db, &item).await.expect("insert item");
    item
}
