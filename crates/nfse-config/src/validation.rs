// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Runs before any network call. Every failed check is collected; the
//! caller sees all problems at once.

use nfse_core::taxid;

use crate::diagnostic::ConfigError;
use crate::model::{NfseConfig, SigningMode};

pub fn validate_config(config: &NfseConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !taxid::is_valid_cnpj(&config.issuer.cnpj) {
        errors.push(ConfigError::validation(format!(
            "issuer.cnpj `{}` is not a valid CNPJ",
            config.issuer.cnpj
        )));
    }

    if config.issuer.inscricao_municipal.trim().is_empty() {
        errors.push(ConfigError::validation(
            "issuer.inscricao_municipal must not be empty",
        ));
    }

    let code = &config.issuer.codigo_municipio;
    if code.len() != 7 || !code.chars().all(|c| c.is_ascii_digit()) {
        errors.push(ConfigError::validation(format!(
            "issuer.codigo_municipio must be a 7-digit IBGE code, got `{code}`"
        )));
    }

    for (name, endpoint) in config.endpoints.named() {
        if let Err(message) = check_endpoint(endpoint) {
            errors.push(ConfigError::validation(format!("endpoints.{name}: {message}")));
        }
    }

    if config.signing.mode == SigningMode::Xmldsig {
        if config.signing.key_path.is_none() {
            errors.push(ConfigError::validation(
                "signing.key_path is required when signing.mode = \"xmldsig\"",
            ));
        }
        if config.signing.certificate_path.is_none() {
            errors.push(ConfigError::validation(
                "signing.certificate_path is required when signing.mode = \"xmldsig\"",
            ));
        }
    }

    if config.signing.passphrase_env.trim().is_empty() {
        errors.push(ConfigError::validation("signing.passphrase_env must not be empty"));
    }

    if config.service.connect_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "service.connect_timeout_secs must be greater than zero",
        ));
    }

    if config.service.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "service.request_timeout_secs must be greater than zero",
        ));
    }

    if config.polling.max_attempts < 1 {
        errors.push(ConfigError::validation(format!(
            "polling.max_attempts must be at least 1, got {}",
            config.polling.max_attempts
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Remote endpoints must use HTTPS; localhost is exempt.
fn check_endpoint(endpoint: &str) -> Result<(), String> {
    let parsed = url::Url::parse(endpoint).map_err(|e| format!("invalid URL `{endpoint}`: {e}"))?;
    let host = parsed.host_str().unwrap_or("");

    if is_localhost(host) || parsed.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("`{endpoint}` must use https"))
    }
}

fn is_localhost(host: &str) -> bool {
    matches!(host, "localhost" | "::1" | "[::1]") || host.starts_with("127.")
}
