//! Authenticated JSON endpoint that relays a plain-text email to a fixed
//! recipient through a pluggable mail transport.
//!
//! ```text
//! POST /sendmail
//! Authorization: Bearer <SENDMAIL_API_KEY>
//! {"subject": "...", "body": "..."}
//! ```

pub mod config;
pub mod email;
pub mod logger;
pub mod routes;

pub use config::{get_defaults, ApiConfig, ConfigError, SmtpTls, TransportKind};
pub use email::{
    build_raw_email, sanitize_header, EmailState, MailPayload, MailTransport, Mailer,
    OutboundMessage, TransportError,
};
pub use routes::{create_router, is_authorized, json_response, ApiError, SENDMAIL_PATH};
