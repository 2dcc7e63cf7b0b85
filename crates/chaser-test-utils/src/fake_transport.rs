// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted fake delivery transport.
//!
//! Outcomes are popped from a FIFO queue. When the queue is empty, the
//! send succeeds with a generated provider message id. Every request is
//! captured for assertion.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chaser_delivery::{DeliveryTransport, SendReceipt, SendRequest, TransportError};

/// Scripted outcome for one `send` call.
pub enum ScriptedSend {
    Ok { provider_message_id: Option<String> },
    Permanent { detail: String },
    Transient { detail: String },
}

/// A fake transport with pre-configured send outcomes.
pub struct FakeTransport {
    script: Arc<Mutex<VecDeque<ScriptedSend>>>,
    sent: Arc<Mutex<Vec<SendRequest>>>,
}

impl FakeTransport {
    /// Create a fake transport with an empty script; every send succeeds.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a fake transport pre-loaded with the given outcomes.
    pub fn with_script(script: Vec<ScriptedSend>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(script))),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue another outcome.
    pub async fn push_outcome(&self, outcome: ScriptedSend) {
        self.script.lock().await.push_back(outcome);
    }

    /// All requests seen so far, in order.
    pub async fn sent_requests(&self) -> Vec<SendRequest> {
        self.sent.lock().await.clone()
    }

    /// Number of send attempts observed.
    pub async fn send_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryTransport for FakeTransport {
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, TransportError> {
        self.sent.lock().await.push(request.clone());
        let scripted = self.script.lock().await.pop_front();
        match scripted {
            None => Ok(SendReceipt {
                provider_message_id: Some(format!("fake-{}", self.sent.lock().await.len())),
            }),
            Some(ScriptedSend::Ok { provider_message_id }) => {
                Ok(SendReceipt { provider_message_id })
            }
            Some(ScriptedSend::Permanent { detail }) => {
                Err(TransportError::Permanent { detail })
            }
            Some(ScriptedSend::Transient { detail }) => {
                Err(TransportError::Transient { detail, source: None })
            }
        }
    }
}
