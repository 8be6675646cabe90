//! In-process stand-ins for the upstream services, shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::routing::any;
use axum::Router;
use chrono::{TimeZone, Utc};

use crate::config::Config;
use crate::error::{DispatchError, UpstreamError};
use crate::gateway::Gateway;
use crate::iam::{BearerToken, TokenExchanger};
use crate::secrets::{SecretPayload, SecretRecord, SecretStore};
use crate::sms::{DispatchResult, MessageSender};

pub fn configured() -> Config {
    Config::from_lookup(|key| match key {
        "IAM_API_KEY" => Some("api-key".to_string()),
        "SECRETS_MGR_GUID" => Some("instance-1".to_string()),
        "TWILIO_ACCOUNT_SID" => Some("AC123".to_string()),
        "TWILIO_AUTH_TOKEN" => Some("twilio-token".to_string()),
        _ => None,
    })
}

#[derive(Default)]
pub struct FakeTokens {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl TokenExchanger for FakeTokens {
    async fn exchange_api_key(&self, api_key: &str) -> Result<BearerToken, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(UpstreamError::Unavailable("connection refused".to_string()));
        }
        Ok(BearerToken {
            access_token: format!("bearer-for-{api_key}"),
            expires_in: Some(3600),
            expiration: None,
        })
    }
}

pub struct FakeSecrets {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<(String, String, String, String)>>,
    pub status_code: u16,
    pub payload: Option<SecretPayload>,
    pub malformed: bool,
}

impl FakeSecrets {
    pub fn returning(status_code: u16, auth_token: &str, send_sms_messages: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            status_code,
            payload: Some(SecretPayload {
                auth_token: auth_token.to_string(),
                send_sms_messages,
            }),
            malformed: false,
        }
    }
}

#[async_trait]
impl SecretStore for FakeSecrets {
    async fn get_secret(
        &self,
        region: &str,
        instance_id: &str,
        token: &str,
        secret_id: &str,
    ) -> Result<SecretRecord, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            region.to_string(),
            instance_id.to_string(),
            token.to_string(),
            secret_id.to_string(),
        ));
        if self.malformed {
            return Err(UpstreamError::MalformedResponse("secret payload".to_string()));
        }
        let payload = if self.status_code == 200 {
            self.payload.clone()
        } else {
            None
        };
        Ok(SecretRecord {
            status_code: self.status_code,
            payload,
        })
    }
}

#[derive(Default)]
pub struct FakeSender {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub reject_with: Option<u16>,
}

impl FakeSender {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageSender for FakeSender {
    async fn send(
        &self,
        message: &str,
        from_number: &str,
        to_number: &str,
    ) -> Result<DispatchResult, DispatchError> {
        self.sent.lock().unwrap().push((
            message.to_string(),
            from_number.to_string(),
            to_number.to_string(),
        ));
        if let Some(status) = self.reject_with {
            return Err(DispatchError::Rejected {
                status,
                message: "provider said no".to_string(),
            });
        }
        Ok(DispatchResult {
            provider_message_id: "SM0001".to_string(),
            body: message.to_string(),
            from_number: from_number.to_string(),
            to_number: to_number.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        })
    }
}

pub struct Harness {
    pub tokens: Arc<FakeTokens>,
    pub secrets: Arc<FakeSecrets>,
    pub sender: Arc<FakeSender>,
    pub gateway: Gateway,
}

impl Harness {
    pub fn new(config: Config, secrets: FakeSecrets) -> Self {
        Self::with(config, FakeTokens::default(), secrets, FakeSender::default())
    }

    pub fn with(
        config: Config,
        tokens: FakeTokens,
        secrets: FakeSecrets,
        sender: FakeSender,
    ) -> Self {
        let tokens = Arc::new(tokens);
        let secrets = Arc::new(secrets);
        let sender = Arc::new(sender);
        let gateway = Gateway::new(
            Arc::new(config),
            tokens.clone(),
            secrets.clone(),
            sender.clone(),
        );
        Self {
            tokens,
            secrets,
            sender,
            gateway,
        }
    }

    pub fn outbound_calls(&self) -> usize {
        self.tokens.calls.load(Ordering::SeqCst)
            + self.secrets.calls.load(Ordering::SeqCst)
            + self.sender.count()
    }
}

/// A request as seen by a [`Stub`].
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

/// A canned upstream on `127.0.0.1`, answering each configured path with a
/// fixed status and body after an optional delay.
pub struct Stub {
    pub base_url: String,
    pub captured: Arc<Mutex<Vec<Captured>>>,
}

impl Stub {
    pub async fn start(routes: &[(&str, u16, &'static str)]) -> Self {
        Self::start_delayed(routes, Duration::ZERO).await
    }

    pub async fn start_delayed(routes: &[(&str, u16, &'static str)], delay: Duration) -> Self {
        let captured: Arc<Mutex<Vec<Captured>>> = Arc::default();
        let mut router = Router::new();
        for &(path, status, reply) in routes {
            let seen = captured.clone();
            let status = StatusCode::from_u16(status).unwrap();
            let handler = move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
                let seen = seen.clone();
                async move {
                    let header = |name: HeaderName| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    seen.lock().unwrap().push(Captured {
                        method,
                        path: uri.path().to_string(),
                        authorization: header(AUTHORIZATION),
                        content_type: header(CONTENT_TYPE),
                        body,
                    });
                    tokio::time::sleep(delay).await;
                    (status, reply)
                }
            };
            router = router.route(path, any(handler));
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            captured,
        }
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }
}

pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder().timeout(timeout).build().unwrap()
}
