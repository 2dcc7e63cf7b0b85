// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chaser integration tests.
//!
//! Provides a scripted fake transport and database seeding helpers for
//! fast, deterministic, CI-runnable tests without external services.

pub mod fake_transport;
pub mod fixtures;

pub use fake_transport::{FakeTransport, ScriptedSend};
pub use fixtures::{seed_item, seed_recipient, temp_db, test_now};
