// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transport seam between the queue processor and the email provider.

use async_trait::async_trait;

/// A fully rendered message ready to hand to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SendRequest {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
    pub open_tracking: bool,
    pub click_tracking: bool,
}

/// Provider acknowledgement of an accepted message.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    /// The provider's message id, used later to correlate webhooks.
    pub provider_message_id: Option<String>,
}

/// A failed send, classified by whether a retry could succeed.
///
/// Transient failures (timeouts, rate limits, provider 5xx) are retried
/// with backoff; permanent failures (rejected payloads, auth errors) burn
/// no further attempts.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("permanent delivery failure: {detail}")]
    Permanent { detail: String },
    #[error("transient delivery failure: {detail}")]
    Transient {
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Abstraction over the outbound email provider.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, TransportError>;
}
