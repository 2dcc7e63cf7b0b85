// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery adapter for the Chaser follow-up engine.
//!
//! [`Deliverer`] renders an item's subject and body and hands the result to
//! a [`DeliveryTransport`]. The transport classifies every failure as
//! permanent or transient; the queue processor turns that classification
//! into its retry decision.

pub mod http;
pub mod render;
pub mod transport;

use std::sync::Arc;

use tracing::warn;

use chaser_core::types::{FollowupItem, Recipient};

pub use http::HttpEmailTransport;
pub use transport::{DeliveryTransport, SendReceipt, SendRequest, TransportError};

/// Result of one delivery attempt, as the queue processor sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered { provider_message_id: Option<String> },
    Failed { transient: bool, detail: String },
}

/// Renders followup content and drives the transport.
#[derive(Clone)]
pub struct Deliverer {
    transport: Arc<dyn DeliveryTransport>,
    business_name: String,
    open_tracking: bool,
    click_tracking: bool,
}

impl Deliverer {
    pub fn new(
        transport: Arc<dyn DeliveryTransport>,
        business_name: String,
        open_tracking: bool,
        click_tracking: bool,
    ) -> Self {
        Self { transport, business_name, open_tracking, click_tracking }
    }

    /// Render and send one followup. Never returns an error: every failure
    /// is folded into [`DeliveryOutcome::Failed`] so a bad item cannot
    /// abort the batch it is part of.
    pub async fn deliver(&self, item: &FollowupItem, recipient: &Recipient) -> DeliveryOutcome {
        let client_name = recipient.name.as_deref().unwrap_or(&recipient.email);
        let request = SendRequest {
            to_email: recipient.email.clone(),
            to_name: recipient.name.clone(),
            subject: render::render(&item.subject, client_name, &self.business_name),
            body: render::render(&item.body, client_name, &self.business_name),
            open_tracking: self.open_tracking,
            click_tracking: self.click_tracking,
        };

        match self.transport.send(&request).await {
            Ok(receipt) => DeliveryOutcome::Delivered {
                provider_message_id: receipt.provider_message_id,
            },
            Err(e) => {
                warn!(item_id = %item.id, transient = e.is_transient(), error = %e, "delivery failed");
                DeliveryOutcome::Failed { transient: e.is_transient(), detail: e.to_string() }
            }
        }
    }
}
