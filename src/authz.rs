use std::fmt;

use subtle::ConstantTimeEq;

use crate::secrets::SecretRecord;

/// Why a request was refused. Each variant maps to a 403 with a fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    AccessKeyNotFound,
    AuthTokenInvalid,
    NotPermittedToSendSms,
}

impl Denial {
    pub fn message(self) -> &'static str {
        match self {
            Denial::AccessKeyNotFound => "Access Forbidden: The provided Access Key was not found",
            Denial::AuthTokenInvalid => "Access Forbidden: The provided Auth Token is not valid",
            Denial::NotPermittedToSendSms => {
                "Access Forbidden: The provided Auth Token is not permitted to send SMS messages"
            }
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied(Denial),
    /// The identity provider or secrets vault could not be consulted.
    Upstream(String),
}

/// Decides whether `caller_auth_token` may send SMS according to `secret`.
///
/// The gates run in a fixed order and the first failure wins: the record must
/// have been found, the token must match, and only then is the permission flag
/// consulted.
pub fn evaluate(secret: &SecretRecord, caller_auth_token: &str) -> AuthDecision {
    let payload = match (&secret.payload, secret.status_code) {
        (Some(payload), 200) => payload,
        _ => return AuthDecision::Denied(Denial::AccessKeyNotFound),
    };

    let matches: bool = payload
        .auth_token
        .as_bytes()
        .ct_eq(caller_auth_token.as_bytes())
        .into();
    if !matches {
        return AuthDecision::Denied(Denial::AuthTokenInvalid);
    }

    if !payload.send_sms_messages {
        return AuthDecision::Denied(Denial::NotPermittedToSendSms);
    }

    AuthDecision::Allowed
}
