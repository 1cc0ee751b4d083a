// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/nfse/nfse.toml`
//! 3. `~/.config/nfse/nfse.toml`
//! 4. `./nfse.toml`
//! 5. `NFSE_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::NfseConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/nfse/nfse.toml";
pub(crate) const LOCAL_CONFIG: &str = "nfse.toml";

/// Sections that environment variables may override.
const SECTIONS: [&str; 6] = ["issuer", "endpoints", "signing", "service", "polling", "logging"];

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("nfse/nfse.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<NfseConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only, over compiled defaults.
pub fn load_config_from_str(toml_content: &str) -> Result<NfseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NfseConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file, with env var overrides.
///
/// Used by `nfse --config <path>`; skips the standard hierarchy.
pub fn load_config_from_path(path: &Path) -> Result<NfseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NfseConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(NfseConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps `NFSE_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses an explicit prefix table rather than `Env::split("_")` because keys
/// contain underscores (`NFSE_POLLING_MAX_ATTEMPTS` is `polling.max_attempts`).
/// Variables outside the known sections, such as the certificate passphrase,
/// are ignored.
fn env_provider() -> Env {
    Env::prefixed("NFSE_")
        .filter(|key| section_key(key.as_str()).is_some())
        .map(|key| {
            section_key(key.as_str())
                .unwrap_or_else(|| key.as_str().to_ascii_lowercase())
                .into()
        })
}

fn section_key(env_key: &str) -> Option<String> {
    let lowered = env_key.to_ascii_lowercase();
    SECTIONS.iter().find_map(|section| {
        lowered
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
            .map(|rest| format!("{section}.{rest}"))
    })
}
