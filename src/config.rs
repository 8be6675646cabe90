use std::time::Duration;

const DEFAULT_CLOUD_DOMAIN: &str = "cloud.ibm.com";
const DEFAULT_SECRETS_REGION: &str = "us-south";
const DEFAULT_SECRETS_DOMAIN: &str = "appdomain.cloud";
const DEFAULT_TWILIO_API_URL: &str = "https://api.twilio.com";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Process-wide settings, read once at startup and shared by reference.
///
/// A missing credential never stops the process; it is reported per request
/// as a misconfigured service.
#[derive(Debug, Clone)]
pub struct Config {
    pub iam_api_key: Option<String>,
    pub secrets_manager_id: Option<String>,
    pub secrets_manager_region: String,
    pub secrets_manager_domain: String,
    pub cloud_domain: String,
    /// Replaces `https://iam.<cloud_domain>`, e.g. for the private IAM endpoint.
    pub iam_url: Option<String>,
    /// Replaces `https://<instance>.<region>.secrets-manager.<domain>`.
    pub secrets_manager_url: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_api_url: String,
    pub log_level: String,
    pub port: u16,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values are treated the same as unset ones.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Unparseable numbers fall back to their defaults.
        let port = get("PORT")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let timeout_secs = get("UPSTREAM_TIMEOUT_SECS")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);

        Self {
            iam_api_key: get("IAM_API_KEY"),
            secrets_manager_id: get("SECRETS_MGR_GUID"),
            secrets_manager_region: get("SECRETS_MGR_REGION")
                .unwrap_or_else(|| DEFAULT_SECRETS_REGION.to_string()),
            secrets_manager_domain: get("SECRETS_MGR_DOMAIN")
                .unwrap_or_else(|| DEFAULT_SECRETS_DOMAIN.to_string()),
            cloud_domain: get("IBMCLOUD_URL").unwrap_or_else(|| DEFAULT_CLOUD_DOMAIN.to_string()),
            iam_url: get("IAM_URL").map(|url| url.trim_end_matches('/').to_string()),
            secrets_manager_url: get("SECRETS_MGR_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            twilio_account_sid: get("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: get("TWILIO_AUTH_TOKEN"),
            twilio_api_url: get("TWILIO_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TWILIO_API_URL.to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            port,
            upstream_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
