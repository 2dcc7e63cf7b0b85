// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-side composite types.
//!
//! The canonical domain types live in `chaser-core::types`; this module
//! re-exports them and adds the composites produced by joined queries.

pub use chaser_core::types::{
    DeliveryEvent, DeliveryEventType, FollowupItem, FollowupStatus, Recipient, RecurrencePattern,
};

/// A claimed due item with the recipient state needed to evaluate the
/// skip/cancel guards, plus the linked invoice status if any.
#[derive(Debug, Clone)]
pub struct DueItem {
    pub item: FollowupItem,
    pub recipient: Recipient,
    pub invoice_status: Option<String>,
}

/// Per-recipient event tallies over the scorer window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientEventCounts {
    pub recipient_id: String,
    pub sent: i64,
    pub delivered: i64,
    pub opened: i64,
    pub clicked: i64,
    pub replied: i64,
    pub bounced: i64,
    pub complained: i64,
}

/// Input for appending a delivery event; the id and timestamp are assigned
/// by the storage layer.
#[derive(Debug, Clone)]
pub struct NewDeliveryEvent {
    pub item_id: Option<String>,
    pub recipient_id: String,
    pub event_type: DeliveryEventType,
    pub provider_message_id: Option<String>,
    pub metadata: Option<String>,
}
