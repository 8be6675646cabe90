use std::sync::Arc;

use log::{debug, info, warn};

use crate::authz::{evaluate, AuthDecision};
use crate::config::Config;
use crate::error::GatewayError;
use crate::iam::TokenExchanger;
use crate::secrets::SecretStore;
use crate::sms::{mask_phone, DispatchResult, MessageSender};
use crate::types::SendRequest;
use crate::validate::ValidatedRequest;

/// Credentials the pipeline needs, borrowed from the config once it has
/// passed the configuration gate.
struct Credentials<'a> {
    api_key: &'a str,
    instance_id: &'a str,
    region: &'a str,
}

/// Runs the send pipeline: config check, validation, token exchange, secret
/// fetch, authorization, dispatch. Every step is a gate and the first failure
/// ends the request; nothing is retried.
pub struct Gateway {
    config: Arc<Config>,
    tokens: Arc<dyn TokenExchanger>,
    secrets: Arc<dyn SecretStore>,
    sender: Arc<dyn MessageSender>,
}

impl Gateway {
    pub fn new(
        config: Arc<Config>,
        tokens: Arc<dyn TokenExchanger>,
        secrets: Arc<dyn SecretStore>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            config,
            tokens,
            secrets,
            sender,
        }
    }

    fn check_config(&self) -> Result<Credentials<'_>, GatewayError> {
        let config = &self.config;
        let api_key = config
            .iam_api_key
            .as_deref()
            .ok_or(GatewayError::Misconfigured("IAM API Key"))?;
        let instance_id = config
            .secrets_manager_id
            .as_deref()
            .ok_or(GatewayError::Misconfigured("Secrets Manager Instance ID"))?;
        if config.twilio_account_sid.is_none() {
            return Err(GatewayError::Misconfigured("Twilio Account SID"));
        }
        if config.twilio_auth_token.is_none() {
            return Err(GatewayError::Misconfigured("Twilio Auth Token"));
        }
        Ok(Credentials {
            api_key,
            instance_id,
            region: &config.secrets_manager_region,
        })
    }

    async fn authorize(&self, creds: &Credentials<'_>, req: &ValidatedRequest) -> AuthDecision {
        let token = match self.tokens.exchange_api_key(creds.api_key).await {
            Ok(token) => token,
            Err(e) => return AuthDecision::Upstream(e.to_string()),
        };
        debug!(
            "Obtained IAM token (expires in {:?}s, at {:?}), fetching secret {}",
            token.expires_in, token.expiration, req.secret_id
        );

        let secret = match self
            .secrets
            .get_secret(
                creds.region,
                creds.instance_id,
                &token.access_token,
                &req.secret_id,
            )
            .await
        {
            Ok(secret) => secret,
            Err(e) => return AuthDecision::Upstream(e.to_string()),
        };
        debug!("Secret {} returned status {}", req.secret_id, secret.status_code);

        evaluate(&secret, &req.auth_token)
    }

    pub async fn send(&self, req: SendRequest) -> Result<DispatchResult, GatewayError> {
        let creds = self.check_config().map_err(|e| {
            warn!("Refusing request: {}", e);
            e
        })?;

        let req = req.into_validated().map_err(|errors| {
            debug!("Request failed validation with {} error(s)", errors.len());
            GatewayError::Validation(errors)
        })?;

        match self.authorize(&creds, &req).await {
            AuthDecision::Allowed => {}
            AuthDecision::Denied(denial) => {
                warn!("Denied secret {}: {}", req.secret_id, denial);
                return Err(GatewayError::Forbidden(denial));
            }
            AuthDecision::Upstream(detail) => return Err(GatewayError::Upstream(detail)),
        }

        debug!(
            "Authorized, dispatching message to {}",
            mask_phone(&req.to_number)
        );
        let result = self
            .sender
            .send(&req.message, &req.from_number, &req.to_number)
            .await?;
        info!(
            "Message {} sent to {}",
            result.provider_message_id,
            mask_phone(&result.to_number)
        );
        Ok(result)
    }
}
