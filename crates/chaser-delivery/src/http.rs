// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport against a Resend-style email API.
//!
//! Sends `POST {provider_url}/emails` with a bearer key and maps the
//! response status onto the permanent/transient failure split the queue
//! processor keys its retry decision on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use chaser_config::model::DeliveryConfig;

use crate::transport::{DeliveryTransport, SendReceipt, SendRequest, TransportError};

#[derive(Debug, Serialize)]
struct ProviderSendBody<'a> {
    from: &'a str,
    to: Vec<String>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    track_opens: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    track_clicks: bool,
}

#[derive(Debug, Deserialize)]
struct ProviderSendResponse {
    id: Option<String>,
}

/// Email transport backed by the provider's HTTP API.
pub struct HttpEmailTransport {
    client: reqwest::Client,
    base_url: String,
    from: String,
}

impl HttpEmailTransport {
    pub fn new(config: &DeliveryConfig) -> Result<Self, TransportError> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            TransportError::Permanent { detail: "delivery.api_key is not configured".into() }
        })?;
        let from = config.from_email.clone().ok_or_else(|| {
            TransportError::Permanent { detail: "delivery.from_email is not configured".into() }
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
            TransportError::Permanent { detail: format!("invalid API key header value: {e}") }
        })?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Transient {
                detail: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.provider_url.trim_end_matches('/').to_string(),
            from,
        })
    }
}

#[async_trait]
impl DeliveryTransport for HttpEmailTransport {
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, TransportError> {
        let to = match &request.to_name {
            Some(name) => format!("{name} <{}>", request.to_email),
            None => request.to_email.clone(),
        };
        let body = ProviderSendBody {
            from: &self.from,
            to: vec![to],
            subject: &request.subject,
            html: &request.body,
            track_opens: request.open_tracking,
            track_clicks: request.click_tracking,
        };

        // Network-level failures (refused connection, timeout) are always
        // worth retrying.
        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Transient {
                detail: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, to = %request.to_email, "provider response received");

        if status.is_success() {
            let parsed: ProviderSendResponse =
                response.json().await.unwrap_or(ProviderSendResponse { id: None });
            return Ok(SendReceipt { provider_message_id: parsed.id });
        }

        let detail = {
            let text = response.text().await.unwrap_or_default();
            format!("provider returned {status}: {text}")
        };
        if is_transient_status(status) {
            Err(TransportError::Transient { detail, source: None })
        } else {
            Err(TransportError::Permanent { detail })
        }
    }
}

/// 408 and 429 are retryable client errors; every 5xx is retryable.
/// Everything else in the 4xx range means the request itself was rejected.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || matches!(status.as_u16(), 408 | 429)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> DeliveryConfig {
        DeliveryConfig {
            provider_url: base_url.to_string(),
            api_key: Some("test-key".into()),
            from_email: Some("billing@example.com".into()),
            business_name: "Acme".into(),
            request_timeout_secs: 5,
            open_tracking: true,
            click_tracking: false,
        }
    }

    fn test_request() -> SendRequest {
        SendRequest {
            to_email: "ada@example.com".into(),
            to_name: Some("Ada".into()),
            subject: "Invoice reminder".into(),
            body: "<p>Hi Ada</p>".into(),
            open_tracking: true,
            click_tracking: false,
        }
    }

    #[tokio::test]
    async fn successful_send_returns_provider_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "from": "billing@example.com",
                "to": ["Ada <ada@example.com>"],
                "subject": "Invoice reminder",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "pm-1"})),
            )
            .mount(&server)
            .await;

        let transport = HttpEmailTransport::new(&test_config(&server.uri())).unwrap();
        let receipt = transport.send(&test_request()).await.unwrap();
        assert_eq!(receipt.provider_message_id.as_deref(), Some("pm-1"));
    }

    #[tokio::test]
    async fn rejected_payload_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_json(
                serde_json::json!({"message": "invalid to address"}),
            ))
            .mount(&server)
            .await;

        let transport = HttpEmailTransport::new(&test_config(&server.uri())).unwrap();
        let err = transport.send(&test_request()).await.unwrap_err();
        assert!(!err.is_transient(), "got: {err}");
        assert!(err.to_string().contains("422"));
    }

    #[tokio::test]
    async fn rate_limit_and_server_errors_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpEmailTransport::new(&test_config(&server.uri())).unwrap();
        let err = transport.send(&test_request()).await.unwrap_err();
        assert!(err.is_transient(), "got: {err}");
        let err = transport.send(&test_request()).await.unwrap_err();
        assert!(err.is_transient(), "got: {err}");
    }

    #[tokio::test]
    async fn unreachable_provider_is_transient() {
        let config = test_config("http://127.0.0.1:1");
        let transport = HttpEmailTransport::new(&config).unwrap();
        let err = transport.send(&test_request()).await.unwrap_err();
        assert!(err.is_transient(), "got: {err}");
    }

    #[tokio::test]
    async fn missing_credentials_fail_construction() {
        let mut config = test_config("http://localhost");
        config.api_key = None;
        assert!(HttpEmailTransport::new(&config).is_err());

        let mut config = test_config("http://localhost");
        config.from_email = None;
        assert!(HttpEmailTransport::new(&config).is_err());
    }
}
