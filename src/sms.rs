use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::Deserialize;

use crate::config::Config;
use crate::error::DispatchError;

/// What the provider reports back for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub provider_message_id: String,
    pub body: String,
    pub from_number: String,
    pub to_number: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(
        &self,
        message: &str,
        from_number: &str,
        to_number: &str,
    ) -> Result<DispatchResult, DispatchError>;
}

/// Keeps the last four digits, e.g. `+15551234567` becomes `********4567`.
pub fn mask_phone(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// Sends through the Twilio Messages REST API.
///
/// Credentials are read from the shared config on each send; a missing one
/// yields `DispatchError::NotConfigured` for callers that bypass the gateway.
pub struct TwilioSender {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl TwilioSender {
    pub fn new(client: reqwest::Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }
}

#[derive(Deserialize)]
struct TwilioMessage {
    sid: String,
    body: String,
    from: String,
    to: String,
    date_created: String,
}

#[derive(Deserialize)]
struct TwilioError {
    message: String,
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send(
        &self,
        message: &str,
        from_number: &str,
        to_number: &str,
    ) -> Result<DispatchResult, DispatchError> {
        let (Some(sid), Some(token)) = (
            self.config.twilio_account_sid.as_deref(),
            self.config.twilio_auth_token.as_deref(),
        ) else {
            return Err(DispatchError::NotConfigured);
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.twilio_api_url, sid
        );
        let params = [("To", to_number), ("From", from_number), ("Body", message)];

        debug!(
            "Calling Twilio to send message from {} to {}",
            mask_phone(from_number),
            mask_phone(to_number)
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Twilio request failed: {}", e);
                DispatchError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DispatchError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            error!("Twilio rejected the message with status {}", status);
            return Err(rejection(status.as_u16(), &body));
        }

        let result = parse_message(&body)?;
        info!(
            "Twilio accepted message {} to {}",
            result.provider_message_id,
            mask_phone(&result.to_number)
        );
        Ok(result)
    }
}

fn rejection(status: u16, body: &str) -> DispatchError {
    let message = serde_json::from_str::<TwilioError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| format!("status {}", status));
    DispatchError::Rejected { status, message }
}

fn parse_message(body: &str) -> Result<DispatchResult, DispatchError> {
    let msg: TwilioMessage = serde_json::from_str(body)
        .map_err(|e| DispatchError::MalformedResponse(e.to_string()))?;
    let created_at = DateTime::parse_from_rfc2822(&msg.date_created)
        .map_err(|e| DispatchError::MalformedResponse(format!("date_created: {}", e)))?
        .with_timezone(&Utc);
    Ok(DispatchResult {
        provider_message_id: msg.sid,
        body: msg.body,
        from_number: msg.from,
        to_number: msg.to,
        created_at,
    })
}
