use async_trait::async_trait;
use log::{debug, error};
use serde::Deserialize;

use crate::error::UpstreamError;

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Short-lived credential obtained for a single request.
#[derive(Debug, Clone, Deserialize)]
pub struct BearerToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub expiration: Option<u64>,
}

#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange_api_key(&self, api_key: &str) -> Result<BearerToken, UpstreamError>;
}

/// Exchanges IBM Cloud API keys at `https://iam.<cloud-domain>/identity/token`.
pub struct IamTokenExchanger {
    client: reqwest::Client,
    token_url: String,
}

impl IamTokenExchanger {
    pub fn new(client: reqwest::Client, cloud_domain: &str) -> Self {
        Self {
            client,
            token_url: format!("https://iam.{}/identity/token", cloud_domain),
        }
    }

    /// Uses `base_url` in place of `https://iam.<cloud-domain>`.
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            token_url: format!("{}/identity/token", base_url.trim_end_matches('/')),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenExchanger for IamTokenExchanger {
    async fn exchange_api_key(&self, api_key: &str) -> Result<BearerToken, UpstreamError> {
        debug!("Exchanging API key for an IAM token at {}", self.token_url);
        let params = [("grant_type", APIKEY_GRANT_TYPE), ("apikey", api_key)];

        let response = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("IAM token request failed: {}", e);
                UpstreamError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("IAM token endpoint returned {}", status);
            return Err(UpstreamError::Rejected(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;
        parse_token(&body)
    }
}

fn parse_token(body: &str) -> Result<BearerToken, UpstreamError> {
    serde_json::from_str(body)
        .map_err(|e| UpstreamError::MalformedResponse(format!("IAM token response: {}", e)))
}
