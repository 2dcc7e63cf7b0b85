// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP trigger and webhook surface for the Chaser follow-up engine.
//!
//! Three route groups: a public health endpoint, bearer-authenticated
//! trigger endpoints (queue, scorer, cleanup, scheduling), and webhook
//! endpoints authenticated by a shared secret header.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod webhooks;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState};
