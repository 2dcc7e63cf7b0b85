// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chaser follow-up engine.
//!
//! This crate provides the error type and domain model shared by the
//! scheduling, storage, delivery, and engine crates. It carries no I/O.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ChaserError;
pub use types::{
    BounceType, DeliveryEvent, DeliveryEventType, FollowupItem, FollowupStatus, Recipient,
    RecurrencePattern, RecurrenceType,
};
