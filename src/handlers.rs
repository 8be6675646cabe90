use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use log::debug;
use tower_http::cors::CorsLayer;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::types::{HealthResponse, SendRequest, SendResponse};

pub struct AppState {
    pub gateway: Gateway,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/messages", post(send_message))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Send request read from either a JSON or a form-encoded body.
///
/// Never rejects: an empty or unreadable body yields missing fields, which the
/// gateway then reports through its own gates.
pub struct SendBody(pub SendRequest);

#[async_trait]
impl<S> FromRequest<S> for SendBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let parsed = match Form::<SendRequest>::from_request(req, state).await {
                Ok(Form(parsed)) => parsed,
                Err(e) => {
                    debug!("Unreadable form body: {}", e);
                    SendRequest::default()
                }
            };
            return Ok(Self(parsed));
        }

        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Unreadable request body: {}", e);
                Bytes::new()
            }
        };
        Ok(Self(SendRequest::from_json_lenient(&bytes)))
    }
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    SendBody(req): SendBody,
) -> Result<impl IntoResponse, GatewayError> {
    debug!("POST /api/v1/messages");
    let result = state.gateway.send(req).await?;

    Ok((
        StatusCode::OK,
        Json(SendResponse {
            status: "Message sent".to_string(),
            sid: result.provider_message_id,
            message: result.body,
            from: result.from_number,
            to: result.to_number,
            date_created: result.created_at,
        }),
    ))
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "UP".to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
