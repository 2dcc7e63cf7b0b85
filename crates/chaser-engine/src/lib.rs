// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Chaser engine: queue processing, webhook handling, scoring, and
//! scheduling intake.
//!
//! Each module is a batch operation over the storage layer. None of them
//! hold long-lived state; the HTTP gateway (or the CLI) constructs the
//! inputs and invokes one pass at a time.

pub mod bounce;
pub mod intake;
pub mod maintenance;
pub mod processor;
pub mod reply;
pub mod scorer;

pub use bounce::{handle_bounce, BounceEvent, WebhookOutcome};
pub use intake::{schedule_followup, FollowupRequest, ScheduleSpec};
pub use maintenance::{run_cleanup, CleanupSummary};
pub use processor::{BatchSummary, QueueProcessor};
pub use reply::{handle_reply, ReplyEvent};
pub use scorer::{run_scorer, ScorerSummary};
