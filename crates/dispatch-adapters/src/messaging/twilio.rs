//! Outbound SMS through the Twilio Messages REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use dispatch_core::phone::Phone;
use dispatch_ports::error::NotifyError;
use dispatch_ports::outbound::MessageSender;
use dispatch_ports::types::SendReceipt;

const API_BASE_URL: &str = "https://api.twilio.com";

/// Twilio error code for a `To` number that cannot receive messages.
const INVALID_TO_NUMBER: u32 = 21211;

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u32>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TwilioSender {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
}

impl TwilioSender {
    pub fn new(account_sid: String, auth_token: String) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::DeliveryFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the API host, e.g. for a regional edge or a mock server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

fn classify(status: StatusCode, body: &str) -> NotifyError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NotifyError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => NotifyError::RateLimited,
        _ => match serde_json::from_str::<ApiError>(body) {
            Ok(ApiError {
                code: Some(INVALID_TO_NUMBER),
                ..
            }) => NotifyError::InvalidTarget,
            Ok(ApiError {
                code,
                message: Some(message),
            }) => NotifyError::DeliveryFailed(match code {
                Some(code) => format!("twilio error {code}: {message}"),
                None => message,
            }),
            _ => NotifyError::DeliveryFailed(format!("twilio returned {status}")),
        },
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send(&self, from: &Phone, to: &Phone, body: &str) -> Result<SendReceipt, NotifyError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        tracing::debug!(status = %status, to = %to, "twilio response received");

        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify(status, &text));
        }

        let resource: MessageResource = serde_json::from_str(&text)
            .map_err(|e| NotifyError::DeliveryFailed(format!("failed to parse response: {e}")))?;
        Ok(SendReceipt {
            external_id: resource.sid,
        })
    }
}
