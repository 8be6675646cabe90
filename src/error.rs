use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;

use crate::authz::Denial;
use crate::types::{ErrorsBody, FieldError, MessageBody};

/// Failure talking to the identity provider or the secrets vault.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("upstream rejected the request with status {0}")]
    Rejected(u16),
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

/// Failure reported by the SMS transport.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("SMS provider unavailable: {0}")]
    Unavailable(String),
    #[error("SMS provider rejected the message: {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed SMS provider response: {0}")]
    MalformedResponse(String),
    /// Only reachable when the sender is used without the gateway, which
    /// checks both Twilio credentials before anything else runs.
    #[error("SMS provider credentials are not configured")]
    NotConfigured,
}

/// Every terminal failure of the send pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Error: There is no {0} configured")]
    Misconfigured(&'static str),
    #[error("request validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Forbidden(Denial),
    #[error("authorization lookup failed: {0}")]
    Upstream(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

const UPSTREAM_MESSAGE: &str = "Error: Unable to reach an upstream authorization service";
const DISPATCH_MESSAGE: &str = "Error: Unable to send the message through the SMS provider";

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Misconfigured(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Dispatch(DispatchError::Rejected { status, .. })
                if (400..500).contains(status) =>
            {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Dispatch(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            GatewayError::Validation(errors) => (status, Json(ErrorsBody { errors })).into_response(),
            GatewayError::Upstream(detail) => {
                error!("Upstream failure: {}", detail);
                let body = MessageBody {
                    message: UPSTREAM_MESSAGE.to_string(),
                };
                (status, Json(body)).into_response()
            }
            // Transport text can carry the provider URL, and with it the account SID.
            GatewayError::Dispatch(e) if !matches!(e, DispatchError::Rejected { .. }) => {
                error!("Dispatch failure: {}", e);
                let body = MessageBody {
                    message: DISPATCH_MESSAGE.to_string(),
                };
                (status, Json(body)).into_response()
            }
            other => {
                let body = MessageBody {
                    message: other.to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
