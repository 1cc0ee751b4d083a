// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Console and operation-log tracing setup.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use nfse_config::model::LoggingConfig;
use nfse_core::NfseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber.
///
/// Console output goes to stderr so command results on stdout stay
/// machine-readable. `RUST_LOG` overrides `logging.level`.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), NfseError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.level));

    let console = fmt::layer()
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let file_layer = match &config.operation_log {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Arc::new(open_operation_log(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| NfseError::Internal(format!("failed to install tracing subscriber: {e}")))
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(filter_directive(level))
}

fn filter_directive(level: &str) -> String {
    format!("nfse={level},warn")
}

/// Opens the log for appending, creating it and its directory if needed.
pub fn open_operation_log(path: &Path) -> Result<File, NfseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            NfseError::Config(format!("cannot create log directory {}: {e}", parent.display()))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| NfseError::Config(format!("cannot open operation log {}: {e}", path.display())))
}
