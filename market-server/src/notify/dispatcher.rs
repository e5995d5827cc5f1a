//! Webhook dispatcher
//!
//! POSTs payloads to the notification orchestrator with linear backoff
//! (`retry_delay × attempt`). Never returns an error: every result, including
//! exhausted retries, is folded into a [`NotificationOutcome`].

use serde_json::Value;
use shared::order::NotificationOutcome;
use std::time::Duration;
use thiserror::Error;

use super::payload::WebhookPayload;

pub const USER_AGENT: &str = "market-server-notifier/1.0";

/// Webhook settings (deployment configuration)
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: Option<String>,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Total attempts, at least one is made
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            timeout: Duration::from_secs(10),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl WebhookConfig {
    /// Enabled with a non-empty URL
    pub fn target(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Webhook is not configured")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookDispatcher {
    pub fn new(config: WebhookConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Deliver one payload, retrying on failure
    pub async fn dispatch(&self, payload: &WebhookPayload) -> NotificationOutcome {
        let Some(url) = self.config.target() else {
            tracing::debug!(
                event_type = %payload.event_type,
                order_id = %payload.order_id,
                "Webhook not configured, dispatch skipped"
            );
            return failed(0, &DispatchError::Disabled);
        };

        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => return failed(0, &DispatchError::Serialization(e)),
        };

        let max_attempts = self.config.retry_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(url, &body).await {
                Ok(response) => {
                    tracing::debug!(
                        event_type = %payload.event_type,
                        order_id = %payload.order_id,
                        attempt,
                        "Webhook delivered"
                    );
                    return NotificationOutcome {
                        sent: true,
                        sent_at: shared::util::now_millis(),
                        attempts: attempt,
                        response,
                        error: None,
                    };
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.config.retry_delay * attempt;
                    tracing::warn!(
                        event_type = %payload.event_type,
                        order_id = %payload.order_id,
                        attempt,
                        max_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Webhook attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        event_type = %payload.event_type,
                        order_id = %payload.order_id,
                        attempts = attempt,
                        error = %e,
                        "Webhook dispatch failed after all retries"
                    );
                    return failed(attempt, &e);
                }
            }
        }
    }

    async fn send_once(&self, url: &str, body: &Value) -> Result<Option<Value>, DispatchError> {
        let response = self.client.post(url).json(body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        // 编排器可能返回纯文本
        Ok(Some(
            serde_json::from_str(&text).unwrap_or(Value::String(text)),
        ))
    }
}

fn failed(attempts: u32, error: &DispatchError) -> NotificationOutcome {
    NotificationOutcome {
        sent: false,
        sent_at: shared::util::now_millis(),
        attempts,
        response: None,
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_requires_enabled_and_url() {
        let mut config = WebhookConfig::default();
        assert_eq!(config.target(), None);

        config.url = Some("http://localhost:5678/webhook".to_string());
        assert_eq!(config.target(), None);

        config.enabled = true;
        assert_eq!(config.target(), Some("http://localhost:5678/webhook"));

        config.url = Some("  ".to_string());
        assert_eq!(config.target(), None);
    }

    #[test]
    fn test_failed_outcome_records_error() {
        let outcome = failed(3, &DispatchError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        });
        assert!(!outcome.sent);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Webhook returned status 502: bad gateway")
        );
    }
}
