// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for the storage tests.

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use chaser_core::types::{FollowupItem, FollowupStatus, Recipient};

use crate::database::Database;

pub async fn test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chaser-test.db");
    let db = Database::open(path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

pub fn test_now() -> DateTime<Utc> {
    "2026-03-02T12:00:00Z".parse().unwrap()
}

pub fn test_recipient(id: &str, email: &str) -> Recipient {
    Recipient {
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
    }
}

pub fn test_item(id: &str, recipient_id: &str) -> FollowupItem {
    FollowupItem {
        id: id.to_string(),
        owner_id: "owner-1".to_string(),
        recipient_id: recipient_id.to_string(),
        invoice_id: None,
        sequence_id: None,
        subject: "Friendly reminder".to_string(),
        body: "Hi {{client_name}}, just checking in.".to_string(),
        tone: Some("friendly".to_string()),
        channel: "email".to_string(),
        status: FollowupStatus::Draft,
        scheduled_at: None,
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
    }
}
