//! Configuration module for the sendmail API.

use std::str::FromStr;

use lettre::message::Mailbox;
use thiserror::Error;

/// Errors raised while assembling the configuration at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("invalid mailbox in {var}: {reason}")]
    Address { var: &'static str, reason: String },
}

/// Which lettre transport delivers the raw messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Smtp,
    File,
}

impl FromStr for TransportKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "file" => Ok(Self::File),
            _ => Err(()),
        }
    }
}

/// TLS mode used when connecting to the SMTP relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpTls {
    StartTls,
    Tls,
    None,
}

impl FromStr for SmtpTls {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" => Ok(Self::Tls),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Struct containing all configuration options.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub from_address: String,
    pub to_address: String,
    pub listen_addr: String,
    pub listen_port: u16,
    pub transport: TransportKind,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_tls: SmtpTls,
    pub outbox_dir: String,
    pub body_limit: usize,
    pub log_level: String,
    pub log_to_stdout: bool,
    pub log_to_file: bool,
    pub log_dir: String,
    pub log_file: String,
}

/// # get_defaults()
/// Returns an `ApiConfig` populated with default values. The secret and both
/// addresses are left empty; they have no sensible default and must come
/// from the environment.
///
/// --------------------------------------------------------------------
/// ## App defaults:
/// |`listen_addr`|`listen_port`|`body_limit`|`transport`|`outbox_dir`|
/// |:-----------:|:-----------:|:----------:|:---------:|:----------:|
/// |`127.0.0.1`  |`8080`       |`2097152`   |`file`     |`outbox`    |
/// --------------------------------------------------------------------
/// ## SMTP defaults:
/// | `smtp_host`| `smtp_port`| `smtp_username`| `smtp_password`|`smtp_tls`|
/// |:----------:|:----------:|:--------------:|:--------------:|:--------:|
/// | `localhost`|`587`       |`user`          |`password`      |`starttls`|
/// --------------------------------------------------------------------
/// ## Log defaults:
/// |`log_file`     |`log_dir`|`log_to_file`|`log_to_stdout`|`log_level`|
/// |:-------------:|:-------:|:-----------:|:-------------:|:---------:|
/// |`sendmail.log` |`logs`   |`false`      |`true`         |`INFO`     |
/// --------------------------------------------------------------------
pub fn get_defaults() -> ApiConfig {
    ApiConfig {
        api_key: String::new(),
        from_address: String::new(),
        to_address: String::new(),
        listen_addr: "127.0.0.1".into(),
        listen_port: 8080,
        transport: TransportKind::File,
        smtp_host: "localhost".into(),
        smtp_port: 587,
        smtp_username: "user".into(),
        smtp_password: "password".into(),
        smtp_tls: SmtpTls::StartTls,
        outbox_dir: "outbox".into(),
        body_limit: crate::routes::DEFAULT_BODY_LIMIT,
        log_level: "INFO".into(),
        log_to_stdout: true,
        log_to_file: false,
        log_dir: "logs".into(),
        log_file: "sendmail.log".into(),
    }
}

impl ApiConfig {
    /// Build the configuration from process environment variables.
    ///
    /// # Environment Variables:
    /// |Variable|Description|
    /// |:------:|:---------:|
    /// |`SENDMAIL_API_KEY`|Shared bearer secret (required)|
    /// |`FROM_ADDRESS`|Sender mailbox (required)|
    /// |`TO_ADDRESS`|Recipient mailbox (required)|
    /// |`LISTEN_ADDR`|Address to bind to (e.g. `127.0.0.1`)|
    /// |`LISTEN_PORT`|Port to bind to (e.g. `8080`)|
    /// |`TRANSPORT`|Email transport method (`smtp` or `file`)|
    /// |`SMTP_HOST`|SMTP server hostname|
    /// |`SMTP_PORT`|SMTP server port|
    /// |`SMTP_USERNAME`|SMTP username for authentication|
    /// |`SMTP_PASSWORD`|SMTP password for authentication|
    /// |`SMTP_TLS`|`starttls`, `tls` or `none`|
    /// |`OUTBOX_DIR`|Directory to store emails when using `file` transport|
    /// |`BODY_LIMIT`|Maximum accepted request body, in bytes|
    /// |`LOG_LEVEL`|Log level (DEBUG, INFO, WARN, ERROR)|
    /// |`LOG_TO_STDOUT`|Whether to log to stdout (true/false)|
    /// |`LOG_TO_FILE`|Whether to log to file (true/false)|
    /// |`LOG_DIR`|Directory to log to|
    /// |`LOG_FILE`|File to log to (relative to `LOG_DIR`)|
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = get_defaults();

        config.api_key = required(&lookup, "SENDMAIL_API_KEY")?;
        config.from_address = required(&lookup, "FROM_ADDRESS")?;
        config.to_address = required(&lookup, "TO_ADDRESS")?;
        check_mailbox("FROM_ADDRESS", &config.from_address)?;
        check_mailbox("TO_ADDRESS", &config.to_address)?;

        if let Some(v) = lookup("LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("LISTEN_PORT") {
            config.listen_port = parse("LISTEN_PORT", v)?;
        }
        if let Some(v) = lookup("TRANSPORT") {
            config.transport = parse("TRANSPORT", v)?;
        }
        if let Some(v) = lookup("SMTP_HOST") {
            config.smtp_host = v;
        }
        if let Some(v) = lookup("SMTP_PORT") {
            config.smtp_port = parse("SMTP_PORT", v)?;
        }
        if let Some(v) = lookup("SMTP_USERNAME") {
            config.smtp_username = v;
        }
        if let Some(v) = lookup("SMTP_PASSWORD") {
            config.smtp_password = v;
        }
        if let Some(v) = lookup("SMTP_TLS") {
            config.smtp_tls = parse("SMTP_TLS", v)?;
        }
        if let Some(v) = lookup("OUTBOX_DIR") {
            config.outbox_dir = v;
        }
        if let Some(v) = lookup("BODY_LIMIT") {
            config.body_limit = parse("BODY_LIMIT", v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("LOG_TO_STDOUT") {
            config.log_to_stdout = parse("LOG_TO_STDOUT", v.to_ascii_lowercase())?;
        }
        if let Some(v) = lookup("LOG_TO_FILE") {
            config.log_to_file = parse("LOG_TO_FILE", v.to_ascii_lowercase())?;
        }
        if let Some(v) = lookup("LOG_DIR") {
            config.log_dir = v;
        }
        if let Some(v) = lookup("LOG_FILE") {
            config.log_file = v;
        }

        Ok(config)
    }

    /// `LISTEN_ADDR:LISTEN_PORT`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var).ok_or(ConfigError::Missing(var))?;
    if value.is_empty() {
        return Err(ConfigError::Empty(var));
    }
    Ok(value)
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

fn check_mailbox(var: &'static str, value: &str) -> Result<(), ConfigError> {
    value
        .parse::<Mailbox>()
        .map(|_| ())
        .map_err(|e| ConfigError::Address {
            var,
            reason: e.to_string(),
        })
}
