// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types shared across the Chaser workspace.
//!
//! All timestamps are `chrono::DateTime<Utc>`; the storage layer persists
//! them as RFC 3339 text with a trailing `Z` so lexicographic order in SQL
//! matches chronological order.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a followup item.
///
/// `Sending` is the claim state: the queue processor flips `Queued` rows to
/// `Sending` in a single conditional update so two overlapping batch runs
/// can never both attempt delivery on the same item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FollowupStatus {
    Draft,
    Queued,
    Sending,
    Sent,
    Failed,
    Cancelled,
    Paused,
}

impl FollowupStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed | Self::Cancelled)
    }
}

/// Frequency of a recurrence pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A rule describing repeated scheduling.
///
/// `days_of_week` uses 0 = Sunday through 6 = Saturday and only applies to
/// weekly patterns. `end_after_count` and `end_date` bound the series; the
/// queue processor checks them before enqueuing the next occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub recurrence_type: RecurrenceType,
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Time of day in "HH:MM" (UTC).
    pub time_of_day: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<BTreeSet<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_after_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

fn default_interval() -> u32 {
    1
}

/// One scheduled or sent followup message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupItem {
    pub id: String,
    pub owner_id: String,
    pub recipient_id: String,
    pub invoice_id: Option<String>,
    pub sequence_id: Option<String>,
    /// Subject and body are opaque text -- AI-generated or user-authored.
    pub subject: String,
    pub body: String,
    pub tone: Option<String>,
    pub channel: String,
    pub status: FollowupStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Guard: pending sends stop once the recipient has replied.
    pub pause_on_reply: bool,
    /// Guard: pending sends stop once the linked invoice is paid.
    pub cancel_if_paid: bool,
    pub recurrence: Option<RecurrencePattern>,
    /// 1-based position within a recurring series.
    pub occurrence: u32,
    /// Claim deadline while `status == Sending`; stale claims are recovered.
    pub locked_until: Option<DateTime<Utc>>,
    pub provider_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of entry in the append-only delivery event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryEventType {
    Sent,
    Delivered,
    Bounced,
    Complained,
    Opened,
    Clicked,
    Replied,
}

/// Append-only log row. Never mutated; the source of truth for the
/// engagement scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub id: i64,
    /// Absent when a webhook could only be resolved to a recipient.
    pub item_id: Option<String>,
    pub recipient_id: String,
    pub event_type: DeliveryEventType,
    pub provider_message_id: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The engine-relevant subset of a client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    /// "Do not send" flag; set by hard bounces and spam complaints.
    pub unsubscribed: bool,
    pub followups_paused: bool,
    pub last_reply_at: Option<DateTime<Utc>>,
    /// Derived 0-100 metric; informational only, never blocks delivery.
    pub engagement_score: i64,
    pub soft_bounce_count: i64,
    pub hard_bounce_count: i64,
    pub complaint_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provider-reported bounce classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BounceType {
    Hard,
    Soft,
    Complaint,
}

/// Invoice status value that triggers the cancel-if-paid guard.
pub const INVOICE_STATUS_PAID: &str = "paid";

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            FollowupStatus::Draft,
            FollowupStatus::Queued,
            FollowupStatus::Sending,
            FollowupStatus::Sent,
            FollowupStatus::Failed,
            FollowupStatus::Cancelled,
            FollowupStatus::Paused,
        ] {
            let s = status.to_string();
            assert_eq!(FollowupStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(FollowupStatus::Sent.is_terminal());
        assert!(FollowupStatus::Failed.is_terminal());
        assert!(FollowupStatus::Cancelled.is_terminal());
        assert!(!FollowupStatus::Queued.is_terminal());
        assert!(!FollowupStatus::Sending.is_terminal());
        assert!(!FollowupStatus::Paused.is_terminal());
    }

    #[test]
    fn recurrence_pattern_deserializes_from_json() {
        let json = r#"{
            "type": "weekly",
            "interval": 2,
            "time_of_day": "09:00",
            "days_of_week": [1, 3, 5],
            "end_after_count": 6
        }"#;
        let pattern: RecurrencePattern = serde_json::from_str(json).unwrap();
        assert_eq!(pattern.recurrence_type, RecurrenceType::Weekly);
        assert_eq!(pattern.interval, 2);
        assert_eq!(pattern.time_of_day, "09:00");
        assert_eq!(
            pattern.days_of_week.unwrap().into_iter().collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
        assert_eq!(pattern.end_after_count, Some(6));
        assert!(pattern.end_date.is_none());
    }

    #[test]
    fn recurrence_interval_defaults_to_one() {
        let json = r#"{"type": "daily", "time_of_day": "08:30"}"#;
        let pattern: RecurrencePattern = serde_json::from_str(json).unwrap();
        assert_eq!(pattern.interval, 1);
    }

    #[test]
    fn event_type_strings_match_provider_vocabulary() {
        assert_eq!(DeliveryEventType::Sent.to_string(), "sent");
        assert_eq!(DeliveryEventType::Complained.to_string(), "complained");
        assert_eq!(
            DeliveryEventType::from_str("replied").unwrap(),
            DeliveryEventType::Replied
        );
    }
}
