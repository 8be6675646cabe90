use async_trait::async_trait;
use log::{debug, error};
use serde::Deserialize;

use crate::error::UpstreamError;

/// The authorization data stored in an arbitrary secret.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPayload {
    pub auth_token: String,
    /// Absent means the permission was never granted.
    #[serde(default)]
    pub send_sms_messages: bool,
}

/// A secret lookup result. `payload` is only decoded for a 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub status_code: u16,
    pub payload: Option<SecretPayload>,
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(
        &self,
        region: &str,
        instance_id: &str,
        token: &str,
        secret_id: &str,
    ) -> Result<SecretRecord, UpstreamError>;
}

enum Endpoint {
    /// `https://<instance>.<region>.secrets-manager.<domain>`
    Domain(String),
    /// A fixed base URL, used for every instance and region.
    BaseUrl(String),
}

/// Reads arbitrary secrets from IBM Cloud Secrets Manager.
pub struct SecretsManagerClient {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl SecretsManagerClient {
    pub fn new(client: reqwest::Client, domain: &str) -> Self {
        Self {
            client,
            endpoint: Endpoint::Domain(domain.to_string()),
        }
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: Endpoint::BaseUrl(base_url.trim_end_matches('/').to_string()),
        }
    }

    pub fn secret_url(&self, region: &str, instance_id: &str, secret_id: &str) -> String {
        let base = match &self.endpoint {
            Endpoint::Domain(domain) => format!(
                "https://{instance}.{region}.secrets-manager.{domain}",
                instance = instance_id,
                region = region,
                domain = domain
            ),
            Endpoint::BaseUrl(url) => url.clone(),
        };
        format!("{}/api/v1/secrets/arbitrary/{}", base, secret_id)
    }
}

#[async_trait]
impl SecretStore for SecretsManagerClient {
    async fn get_secret(
        &self,
        region: &str,
        instance_id: &str,
        token: &str,
        secret_id: &str,
    ) -> Result<SecretRecord, UpstreamError> {
        let url = self.secret_url(region, instance_id, secret_id);
        debug!("Fetching secret from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                error!("Secrets Manager request failed: {}", e);
                UpstreamError::Unavailable(e.to_string())
            })?;

        let status_code = response.status().as_u16();
        debug!("Secrets Manager returned {}", status_code);
        if status_code != 200 {
            return Ok(SecretRecord {
                status_code,
                payload: None,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;
        let payload = decode_payload(&body)?;
        Ok(SecretRecord {
            status_code,
            payload: Some(payload),
        })
    }
}

#[derive(Deserialize)]
struct GetSecretResponse {
    resources: Vec<SecretResource>,
}

#[derive(Deserialize)]
struct SecretResource {
    secret_data: SecretData,
}

#[derive(Deserialize)]
struct SecretData {
    payload: String,
}

/// Decodes `resources[0].secret_data.payload`, which is itself a JSON document
/// serialized into a string.
fn decode_payload(body: &str) -> Result<SecretPayload, UpstreamError> {
    let parsed: GetSecretResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::MalformedResponse(format!("secret response: {}", e)))?;
    let resource = parsed.resources.into_iter().next().ok_or_else(|| {
        UpstreamError::MalformedResponse("secret response has no resources".to_string())
    })?;
    serde_json::from_str(&resource.secret_data.payload)
        .map_err(|e| UpstreamError::MalformedResponse(format!("secret payload: {}", e)))
}
