//! Test utilities for integration tests.
//!
//! A recording [`MailTransport`], router construction helpers and a tracing
//! layer that counts error records emitted by this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use sendmail_api::{create_router, EmailState, MailTransport, OutboundMessage, TransportError};

pub const TEST_SECRET: &str = "secret";
pub const FROM: &str = "from@example.com";
pub const TO: &str = "to@example.com";
pub const BODY_LIMIT: usize = sendmail_api::routes::DEFAULT_BODY_LIMIT;

// =============================================================================
// Recording transport
// =============================================================================

/// Transport that stores every message it is asked to send, optionally
/// failing each attempt.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    attempts: Arc<AtomicUsize>,
    fail: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TransportError::Rejected("quota exceeded".into()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

// =============================================================================
// Router helpers
// =============================================================================

pub fn router_with(transport: &RecordingTransport) -> Router {
    router_with_addresses(transport, FROM, TO)
}

pub fn router_with_addresses(transport: &RecordingTransport, from: &str, to: &str) -> Router {
    let state = EmailState::new(TEST_SECRET, from, to, Arc::new(transport.clone()));
    create_router(state, BODY_LIMIT)
}

pub fn router_with_limit(transport: &RecordingTransport, body_limit: usize) -> Router {
    let state = EmailState::new(TEST_SECRET, FROM, TO, Arc::new(transport.clone()));
    create_router(state, body_limit)
}

/// POST `/sendmail` with the given bearer token and raw body.
pub fn sendmail_request(token: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/sendmail")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(body.into()).unwrap()
}

pub fn json_request(token: &str, body: serde_json::Value) -> Request<Body> {
    sendmail_request(Some(token), body.to_string())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Error record counter
// =============================================================================

/// Counts ERROR events from any target.
#[derive(Clone, Default)]
pub struct ErrorCounter(Arc<AtomicUsize>);

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
