//! LINE Messaging API push channel.
//!
//! Posts `{to, messages: [{type: "text", text}]}` to `/v2/bot/message/push`
//! with the sending department's channel access token. A 429 is retried
//! after a fixed backoff, up to `max_retries` times. Every other failure is
//! logged and reported as a [`Delivery`], never raised.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use shiftminus_core::config::LineConfig;
use shiftminus_core::error::Result;
use shiftminus_core::traits::Messenger;
use shiftminus_core::types::{Delivery, PushTarget};
use std::time::Duration;

#[derive(Serialize)]
struct PushMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [PushMessage<'a>; 1],
}

/// LINE push client.
pub struct LineMessenger {
    push_url: String,
    max_retries: u32,
    backoff: Duration,
    client: reqwest::Client,
}

impl LineMessenger {
    pub fn new(config: &LineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            push_url: format!("{}/v2/bot/message/push", config.api_base.trim_end_matches('/')),
            max_retries: config.max_retries,
            backoff: Duration::from_secs(config.rate_limit_backoff_secs),
            client,
        })
    }

    /// Override the 429 backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn push_once(&self, target: &PushTarget, text: &str) -> Result<StatusCode> {
        let body = PushRequest {
            to: &target.channel_id,
            messages: [PushMessage { kind: "text", text }],
        };
        let response = self
            .client
            .post(&self.push_url)
            .bearer_auth(&target.access_token)
            .json(&body)
            .send()
            .await?;
        Ok(response.status())
    }
}

#[async_trait]
impl Messenger for LineMessenger {
    async fn send(&self, target: &PushTarget, text: &str) -> Delivery {
        if !target.is_configured() {
            tracing::warn!("⚠️ LINE push skipped: channel id or access token missing");
            return Delivery::Skipped;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let status = match self.push_once(target, text).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!("⚠️ LINE push to {} failed: {e}", target.channel_id);
                    return Delivery::Failed { status: None, attempts: attempt };
                }
            };
            tracing::info!("📨 LINE push to {} (try {attempt}): {status}", target.channel_id);

            if status == StatusCode::OK {
                return Delivery::Sent { attempts: attempt };
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt > self.max_retries {
                    tracing::warn!("⚠️ LINE push still rate limited, giving up");
                    return Delivery::RateLimited { attempts: attempt };
                }
                tracing::info!("⏳ 429 from LINE, waiting {}s", self.backoff.as_secs());
                tokio::time::sleep(self.backoff).await;
                continue;
            }
            tracing::warn!("⚠️ LINE push to {} rejected with {status}", target.channel_id);
            return Delivery::Failed { status: Some(status.as_u16()), attempts: attempt };
        }
    }

    fn channel_name(&self) -> &str {
        "line"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messenger_for(server: &MockServer) -> LineMessenger {
        let config = LineConfig {
            api_base: server.uri(),
            ..LineConfig::default()
        };
        LineMessenger::new(&config).unwrap().with_backoff(Duration::ZERO)
    }

    fn target() -> PushTarget {
        PushTarget::new("C-group", "tok")
    }

    #[tokio::test]
    async fn test_push_payload_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .and(header("Authorization", "Bearer tok"))
            .and(body_json(serde_json::json!({
                "to": "C-group",
                "messages": [{"type": "text", "text": "こんにちは"}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let delivery = messenger_for(&server).send(&target(), "こんにちは").await;
        assert_eq!(delivery, Delivery::Sent { attempts: 1 });
    }

    #[tokio::test]
    async fn test_rate_limited_then_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let delivery = messenger_for(&server).send(&target(), "hi").await;
        assert_eq!(delivery, Delivery::Sent { attempts: 2 });
    }

    #[tokio::test]
    async fn test_rate_limited_twice_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let delivery = messenger_for(&server).send(&target(), "hi").await;
        assert_eq!(delivery, Delivery::RateLimited { attempts: 2 });
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let delivery = messenger_for(&server).send(&target(), "hi").await;
        assert_eq!(delivery, Delivery::Failed { status: Some(400), attempts: 1 });
    }

    #[tokio::test]
    async fn test_unconfigured_target_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let delivery = messenger_for(&server)
            .send(&PushTarget::new("C-group", ""), "hi")
            .await;
        assert_eq!(delivery, Delivery::Skipped);
    }

    #[test]
    fn test_channel_name() {
        let messenger = LineMessenger::new(&LineConfig::default()).unwrap();
        assert_eq!(messenger.channel_name(), "line");
    }
}
