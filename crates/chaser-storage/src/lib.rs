// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Chaser follow-up engine.
//!
//! A single-writer `Database` handle (tokio-rusqlite) with embedded
//! refinery migrations, plus query modules for each table family:
//! followup items, recipients, the invoice projection, the append-only
//! delivery event log, and the webhook dedupe ledger.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

#[cfg(test)]
pub(crate) mod test_support;

pub use database::{to_ts, Database};
pub use models::{DueItem, NewDeliveryEvent, RecipientEventCounts};
