// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the messaging gateway.
//!
//! Provides [`HttpGateway`] which handles request construction, bearer
//! authentication, per-call timeouts, and transient error retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use sendra_config::GatewayConfig;
use sendra_core::{MessagingGateway, SendRequest, SendReceipt, SendraError};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, SendMessageBody, SendMessageResponse, TemplatePayload};

/// HTTP client for gateway communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    send_timeout: Duration,
}

impl HttpGateway {
    /// Builds a client from the `[gateway]` config section.
    ///
    /// Requires `base_url` and `access_token` to be set; a deployment
    /// without them has no outbound channel and gets a config error here
    /// rather than a failed send later.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, SendraError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| SendraError::Config("gateway.base_url is not set".into()))?;
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| SendraError::Config("gateway.access_token is not set".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|e| {
                SendraError::Config(format!("invalid access token header value: {e}"))
            })?,
        );
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/json"),
        );

        let send_timeout = Duration::from_secs(config.send_timeout_secs);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(send_timeout)
            .build()
            .map_err(|e| SendraError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                config.api_version
            ),
            max_retries: config.max_retries,
            send_timeout,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    async fn send_once(
        &self,
        phone_number_id: &str,
        body: &SendMessageBody,
    ) -> Result<reqwest::Response, SendraError> {
        let url = format!("{}/{}/messages", self.base_url, phone_number_id);
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendraError::Timeout {
                        duration: self.send_timeout,
                    }
                } else {
                    SendraError::Gateway {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })
    }
}

#[async_trait]
impl MessagingGateway for HttpGateway {
    /// Sends one template message.
    ///
    /// On transient errors (429, 500, 503), retries once after a 1-second
    /// delay. Every other non-2xx response is a gateway error carrying the
    /// provider's message text.
    async fn send_template(&self, request: &SendRequest) -> Result<SendReceipt, SendraError> {
        let body = SendMessageBody {
            to: request.phone_number.clone(),
            template: TemplatePayload {
                name: request.template_name.clone(),
                language_code: request.language_code.clone(),
                components: request.components.clone(),
            },
            sender_user_id: request.sender_user_id.clone(),
        };

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying send after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self.send_once(&request.phone_number_id, &body).await?;
            let status = response.status();
            debug!(status = %status, attempt, "send response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| SendraError::Gateway {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let parsed: SendMessageResponse =
                    serde_json::from_str(&body).map_err(|e| SendraError::Gateway {
                        message: format!("failed to parse send response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(SendReceipt {
                    external_message_id: parsed.message_id,
                    used_phone_number_id: parsed.phone_number_id,
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(SendraError::Gateway {
                    message: format!("gateway returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                api_err.error.message
            } else {
                format!("gateway returned {status}: {body}")
            };
            return Err(SendraError::Gateway {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| SendraError::Gateway {
            message: "send failed after retries".into(),
            source: None,
        }))
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_gateway(base_url: &str) -> HttpGateway {
        let config = GatewayConfig {
            base_url: Some("http://unused".into()),
            access_token: Some("test-token".into()),
            ..GatewayConfig::default()
        };
        HttpGateway::from_config(&config)
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn request() -> SendRequest {
        SendRequest {
            phone_number: "5511999990000".into(),
            template_name: "welcome".into(),
            language_code: "pt_BR".into(),
            components: None,
            sender_user_id: "user-1".into(),
            phone_number_id: "pn-1".into(),
        }
    }

    #[tokio::test]
    async fn sends_template_and_returns_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pn-1/messages"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "to": "5511999990000",
                "template": { "name": "welcome", "language_code": "pt_BR" },
                "sender_user_id": "user-1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message_id": "wamid.123",
                "phone_number_id": "pn-actual",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = test_gateway(&server.uri())
            .send_template(&request())
            .await
            .unwrap();
        assert_eq!(receipt.external_message_id, "wamid.123");
        assert_eq!(receipt.used_phone_number_id.as_deref(), Some("pn-actual"));
    }

    #[tokio::test]
    async fn retries_once_on_transient_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pn-1/messages"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/pn-1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message_id": "wamid.retry",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = test_gateway(&server.uri())
            .send_template(&request())
            .await
            .unwrap();
        assert_eq!(receipt.external_message_id, "wamid.retry");
        assert_eq!(receipt.used_phone_number_id, None);
    }

    #[tokio::test]
    async fn surfaces_provider_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pn-1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "template not approved" },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_gateway(&server.uri())
            .send_template(&request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SendraError::Gateway { ref message, .. } if message == "template not approved"
        ));
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pn-1/messages"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let err = test_gateway(&server.uri())
            .send_template(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, SendraError::Gateway { .. }));
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let config = GatewayConfig {
            access_token: Some("tok".into()),
            ..GatewayConfig::default()
        };
        assert!(matches!(
            HttpGateway::from_config(&config),
            Err(SendraError::Config(_))
        ));
    }
}
