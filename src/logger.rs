//! Logger configuration.

use std::fs;
use std::fs::OpenOptions;
use std::path::Path;

use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::ApiConfig;

/// Sets the global logger for the application.
///
/// * stdout: compact, human-friendly, enabled by `log_to_stdout`.
/// * file: JSON lines appended to `log_dir/log_file`, enabled by `log_to_file`.
///
/// Both layers use `RUST_LOG` when it is set and `log_level` otherwise.
///
/// # Errors
/// 1) The log directory cannot be created or the log file cannot be opened.
/// 2) A global subscriber was already installed.
pub fn set_logger(config: &ApiConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()))
    };

    let stdout_layer = config.log_to_stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(true)
            .with_filter(filter())
    });

    let path = Path::new(&config.log_dir).join(&config.log_file);
    let file_layer = if config.log_to_file {
        fs::create_dir_all(&config.log_dir)?;
        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file)
                .with_filter(filter()),
        )
    } else {
        None
    };

    let subscriber = Registry::default().with(stdout_layer).with(file_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    debug!("Logger initialized at level {}", config.log_level);
    if config.log_to_file {
        debug!("Logging to file: {}", path.display());
    }
    Ok(())
}
