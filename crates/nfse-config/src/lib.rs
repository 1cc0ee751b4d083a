// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the NFSe batch issuer.
//!
//! TOML files in the usual hierarchy plus `NFSE_*` environment overrides,
//! strict key checking (`deny_unknown_fields`), semantic validation, and
//! miette diagnostics with typo suggestions.
//!
//! ```no_run
//! let config = nfse_config::load_and_validate().expect("config errors");
//! println!("issuer: {}", config.issuer.cnpj);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

use nfse_core::NfseError;
use secrecy::SecretString;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{NfseConfig, ServiceMode, SigningMode};

/// Loads the standard hierarchy and validates it.
pub fn load_and_validate() -> Result<NfseConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &collect_toml_sources())),
    }
}

/// Loads an explicit file (plus env overrides) and validates it.
pub fn load_and_validate_path(path: &Path) -> Result<NfseConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Loads a TOML string over defaults and validates it.
pub fn load_and_validate_str(toml_content: &str) -> Result<NfseConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Reads the key passphrase from the environment variable named by
/// `signing.passphrase_env`.
///
/// The value never appears in any config file.
pub fn signing_passphrase(config: &NfseConfig) -> Result<SecretString, NfseError> {
    let var = &config.signing.passphrase_env;
    match std::env::var(var) {
        Ok(value) => Ok(SecretString::from(value)),
        Err(_) => Err(NfseError::Config(format!(
            "environment variable {var} with the certificate passphrase is not set"
        ))),
    }
}

fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string(loader::LOCAL_CONFIG) {
        let path = std::env::current_dir()
            .map(|d| d.join(loader::LOCAL_CONFIG).display().to_string())
            .unwrap_or_else(|_| loader::LOCAL_CONFIG.to_string());
        sources.push((path, content));
    }

    let user = loader::user_config_path();
    if let Ok(content) = std::fs::read_to_string(&user) {
        sources.push((user.display().to_string(), content));
    }

    if let Ok(content) = std::fs::read_to_string(loader::SYSTEM_CONFIG) {
        sources.push((loader::SYSTEM_CONFIG.to_string(), content));
    }

    sources
}
