//! Email state + validation + raw MIME building + sending.

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use lettre::{
    address::Envelope, message::Mailbox, transport::file::AsyncFileTransport,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::{ApiConfig, SmtpTls, TransportKind};

/// Errors reported by a [`MailTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid envelope: {0}")]
    Envelope(String),
    #[error("smtp error: {0}")]
    Smtp(String),
    #[error("file transport error: {0}")]
    File(String),
    #[error("transport rejected message: {0}")]
    Rejected(String),
}

/// Subject and body of a message, both trimmed and non-empty.
///
/// The only way to obtain one is [`MailPayload::from_json`], so holders may
/// rely on the invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailPayload {
    subject: String,
    body: String,
}

impl MailPayload {
    /// Validate a request body. Returns `None` on malformed JSON, a missing or
    /// non-string `subject`/`body`, or either field being blank once trimmed.
    pub fn from_json(bytes: &[u8]) -> Option<Self> {
        let data: Value = serde_json::from_slice(bytes).ok()?;
        let subject = data.get("subject")?.as_str()?.trim();
        let body = data.get("body")?.as_str()?.trim();

        if subject.is_empty() || body.is_empty() {
            return None;
        }

        Some(Self {
            subject: subject.to_string(),
            body: body.to_string(),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Collapse every run of CR/LF into a single space, then trim.
pub fn sanitize_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_break = false;
    for c in value.chars() {
        if c == '\r' || c == '\n' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            in_break = false;
            out.push(c);
        }
    }
    out.trim().to_string()
}

/// Serialize a single-part `text/plain` message. Header values are sanitized,
/// the body is copied as is.
pub fn build_raw_email(from: &str, to: &str, payload: &MailPayload) -> String {
    [
        format!("From: {}", sanitize_header(from)),
        format!("To: {}", sanitize_header(to)),
        format!("Subject: {}", sanitize_header(payload.subject())),
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/plain; charset=utf-8".to_string(),
        "Content-Transfer-Encoding: 8bit".to_string(),
        String::new(),
        payload.body().to_string(),
    ]
    .join("\r\n")
}

/// Envelope plus serialized content handed to a [`MailTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    from: String,
    to: String,
    raw: String,
}

impl OutboundMessage {
    pub fn new(from: impl Into<String>, to: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            raw: raw.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.from
    }

    pub fn recipient(&self) -> &str {
        &self.to
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// SMTP envelope for this message.
    pub fn envelope(&self) -> Result<Envelope, TransportError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| TransportError::Envelope(format!("sender {:?}: {e}", self.from)))?;
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|e| TransportError::Envelope(format!("recipient {:?}: {e}", self.to)))?;
        Envelope::new(Some(from.email), vec![to.email])
            .map_err(|e| TransportError::Envelope(e.to_string()))
    }
}

/// Something that can deliver a fully built message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;
}

/// Transport selected at runtime (SMTP for prod, FILE for local dev).
#[derive(Clone)]
pub enum Mailer {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl Mailer {
    /// Build the transport named by `config.transport`.
    pub fn from_config(config: &ApiConfig) -> Result<Self, anyhow::Error> {
        match config.transport {
            TransportKind::Smtp => build_smtp_mailer(config),
            TransportKind::File => build_file_mailer(Path::new(&config.outbox_dir)),
        }
    }
}

#[async_trait]
impl MailTransport for Mailer {
    async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let envelope = message.envelope()?;
        let raw = message.raw().as_bytes();
        match self {
            Mailer::Smtp(m) => m
                .send_raw(&envelope, raw)
                .await
                .map(|_| ())
                .map_err(|e| TransportError::Smtp(e.to_string())),
            Mailer::File(f) => f
                .send_raw(&envelope, raw)
                .await
                .map(|id| debug!("wrote message {id}"))
                .map_err(|e| TransportError::File(e.to_string())),
        }
    }
}

/// Build an SMTP transport with creds and short timeout.
fn build_smtp_mailer(config: &ApiConfig) -> Result<Mailer, anyhow::Error> {
    use lettre::transport::smtp::authentication::Credentials;

    let host = config.smtp_host.as_str();
    let builder = match config.smtp_tls {
        SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
        SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
        SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
    };
    let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
    Ok(Mailer::Smtp(
        builder
            .port(config.smtp_port)
            .credentials(creds)
            .timeout(Some(Duration::from_secs(15)))
            .build(),
    ))
}

/// Build a file transport (writes `.eml` files), used for local/dev.
fn build_file_mailer(dir: &Path) -> Result<Mailer, anyhow::Error> {
    std::fs::create_dir_all(dir)?;
    Ok(Mailer::File(AsyncFileTransport::new(dir)))
}

/// App-wide email state: bearer secret, addressing and transport.
#[derive(Clone)]
pub struct EmailState {
    pub api_key: String,
    pub from: String,
    pub to: String,
    pub mailer: Arc<dyn MailTransport>,
}

impl EmailState {
    pub fn new(
        api_key: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        mailer: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            from: from.into(),
            to: to.into(),
            mailer,
        }
    }

    /// Build state from the loaded configuration, including the lettre transport.
    pub fn from_config(config: &ApiConfig) -> Result<Self, anyhow::Error> {
        let mailer = Mailer::from_config(config)?;
        Ok(Self::new(
            config.api_key.clone(),
            config.from_address.clone(),
            config.to_address.clone(),
            Arc::new(mailer),
        ))
    }
}
