//! Route handlers: defines the `/sendmail` endpoint, its bearer auth check and
//! the JSON responses every outcome maps to.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tower_http::trace::{DefaultOnFailure, TraceLayer};
use tracing::{debug, error, info, Level};

use crate::email::{build_raw_email, EmailState, MailPayload, OutboundMessage};

/// Path of the only route.
pub const SENDMAIL_PATH: &str = "/sendmail";

/// Fallback body limit when none is configured.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Request outcomes other than success. The display text is what callers see.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    #[error("Not Found")]
    NotFound,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid subject or body")]
    InvalidPayload,
    #[error("Failed to send email")]
    SendFailed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidPayload => StatusCode::BAD_REQUEST,
            ApiError::SendFailed => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_response(self.status(), json!({ "error": self.to_string() }))
    }
}

/// Serialize `data` as the body with a JSON content type.
pub fn json_response(status: StatusCode, data: Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        data.to_string(),
    )
        .into_response()
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub email: Arc<EmailState>,
    pub body_limit: usize,
}

/// Build the application router.
///
/// `POST /sendmail` is the only route; other methods on it get 405 and any
/// other path gets 404, both as JSON.
pub fn create_router(email: EmailState, body_limit: usize) -> Router {
    let state = AppState {
        email: Arc::new(email),
        body_limit,
    };

    Router::new()
        .route(
            SENDMAIL_PATH,
            post(send_mail).fallback(method_not_allowed),
        )
        .fallback(not_found)
        // the handler already logs send failures at ERROR
        .layer(
            TraceLayer::new_for_http().on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
        )
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// True iff `Authorization` is exactly `Bearer <api_key>`.
pub fn is_authorized(headers: &HeaderMap, api_key: &str) -> bool {
    let Some(provided) = headers.get(header::AUTHORIZATION) else {
        return false;
    };
    let expected = format!("Bearer {api_key}");
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Read the body and validate it. Any read failure, including an oversized
/// body, counts as an invalid payload.
async fn parse_payload(body: Body, limit: usize) -> Option<MailPayload> {
    let bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("failed to read request body: {e}");
            return None;
        }
    };
    MailPayload::from_json(&bytes)
}

/// POST `/sendmail`
/// - Requires `Authorization: Bearer <SENDMAIL_API_KEY>`
/// - Requires a JSON body `{"subject": .., "body": ..}`
/// - Returns `{"ok":true}` or `{"error":..}`
pub async fn send_mail(State(state): State<AppState>, request: Request) -> Response {
    match handle_send_mail(&state, request).await {
        Ok(()) => json_response(StatusCode::OK, json!({ "ok": true })),
        Err(e) => e.into_response(),
    }
}

async fn handle_send_mail(state: &AppState, request: Request) -> Result<(), ApiError> {
    let email = state.email.as_ref();

    // 1) Auth, before the body is touched
    if !is_authorized(request.headers(), &email.api_key) {
        debug!("rejected request with missing or wrong bearer token");
        return Err(ApiError::Unauthorized);
    }

    // 2) Payload
    let payload = parse_payload(request.into_body(), state.body_limit)
        .await
        .ok_or(ApiError::InvalidPayload)?;

    // 3) Build + send, once
    let raw = build_raw_email(&email.from, &email.to, &payload);
    let message = OutboundMessage::new(email.from.as_str(), email.to.as_str(), raw);

    if let Err(e) = email.mailer.send(message).await {
        error!(error = %e, "Failed to send email");
        return Err(ApiError::SendFailed);
    }

    info!("email handed to transport");
    Ok(())
}
