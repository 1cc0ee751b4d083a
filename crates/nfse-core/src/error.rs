// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the NFSe batch issuer.

use thiserror::Error;

/// The primary error type used across all NFSe components.
///
/// Component boundaries convert this into structured outcomes
/// (`SubmissionResult`, `PollOutcome`, `WorkflowResult`); it never crosses
/// the orchestrator as a bare error.
#[derive(Debug, Error)]
pub enum NfseError {
    /// Configuration errors (missing identity fields, bad endpoints, missing key paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Key material could not be read, decrypted, or decoded.
    #[error("credential error: {message}")]
    Credential {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// XML digital signature could not be produced or verified.
    #[error("signature error: {0}")]
    Signature(String),

    /// XML parsing or serialization failure.
    #[error("xml error: {0}")]
    Xml(String),

    /// Network-level failure talking to the remote web service.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Input data failed validation (empty batch, invalid record, missing protocol).
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NfseError {
    /// Shorthand for a credential error without an underlying source.
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
            source: None,
        }
    }
}
