// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per table family.

pub mod events;
pub mod invoices;
pub mod items;
pub mod recipients;
pub mod webhooks;
