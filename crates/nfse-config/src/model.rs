// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently ignored.

use std::path::PathBuf;
use std::time::Duration;

use nfse_core::ProviderIdentity;
use serde::{Deserialize, Serialize};

/// Top-level configuration, built once at startup and shared by reference.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NfseConfig {
    /// Issuer (prestador) identity.
    #[serde(default)]
    pub issuer: IssuerConfig,

    /// Web service endpoint URLs.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Digital signature settings.
    #[serde(default)]
    pub signing: SigningConfig,

    /// Remote service selection and timeouts.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Status polling budget.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Console and operation-log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Issuer identity carried in every batch and query.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IssuerConfig {
    /// Issuer CNPJ (digits only or formatted).
    #[serde(default = "default_cnpj")]
    pub cnpj: String,

    /// Municipal registration.
    #[serde(default = "default_inscricao_municipal")]
    pub inscricao_municipal: String,

    /// IBGE code of the issuing municipality.
    #[serde(default = "default_codigo_municipio")]
    pub codigo_municipio: String,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            cnpj: default_cnpj(),
            inscricao_municipal: default_inscricao_municipal(),
            codigo_municipio: default_codigo_municipio(),
        }
    }
}

impl IssuerConfig {
    pub fn identity(&self) -> ProviderIdentity {
        ProviderIdentity {
            cnpj: nfse_core::taxid::normalize(&self.cnpj),
            inscricao_municipal: self.inscricao_municipal.trim().to_string(),
        }
    }
}

fn default_cnpj() -> String {
    "32649500000145".to_string()
}

fn default_inscricao_municipal() -> String {
    "123".to_string()
}

fn default_codigo_municipio() -> String {
    "2700102".to_string()
}

/// Web service endpoints (Abaco homologation environment by default).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointsConfig {
    #[serde(default = "default_recepcionar")]
    pub recepcionar_lote_rps: String,

    #[serde(default = "default_consultar_situacao")]
    pub consultar_situacao_lote: String,

    #[serde(default = "default_consultar_lote")]
    pub consultar_lote_rps: String,

    /// Not called by the workflow; kept for operators querying single RPS.
    #[serde(default = "default_consultar_nfse_por_rps")]
    pub consultar_nfse_por_rps: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            recepcionar_lote_rps: default_recepcionar(),
            consultar_situacao_lote: default_consultar_situacao(),
            consultar_lote_rps: default_consultar_lote(),
            consultar_nfse_por_rps: default_consultar_nfse_por_rps(),
        }
    }
}

impl EndpointsConfig {
    /// All endpoints keyed by their config name, for validation.
    pub fn named(&self) -> [(&'static str, &str); 4] {
        [
            ("recepcionar_lote_rps", &self.recepcionar_lote_rps),
            ("consultar_situacao_lote", &self.consultar_situacao_lote),
            ("consultar_lote_rps", &self.consultar_lote_rps),
            ("consultar_nfse_por_rps", &self.consultar_nfse_por_rps),
        ]
    }
}

const ABACO_BASE: &str = "https://enfs-hom.abaco.com.br/arapiraca/servlet";

fn default_recepcionar() -> String {
    format!("{ABACO_BASE}/arecepcionarloterps?wsdl")
}

fn default_consultar_situacao() -> String {
    format!("{ABACO_BASE}/aconsultarsituacaoloterps?wsdl")
}

fn default_consultar_lote() -> String {
    format!("{ABACO_BASE}/aconsultarloterps?wsdl")
}

fn default_consultar_nfse_por_rps() -> String {
    format!("{ABACO_BASE}/aconsultarnfseporrps?wsdl")
}

/// How batches are signed before submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningMode {
    /// Submit the unsigned document.
    Skip,
    /// Insert a marker comment instead of signatures.
    Simulated,
    /// Full enveloped XML-DSig with the configured key.
    #[default]
    Xmldsig,
}

/// Digital signature configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    #[serde(default)]
    pub mode: SigningMode,

    /// Encrypted PKCS#8 PEM private key.
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// PEM X.509 certificate matching the key.
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,

    /// Name of the environment variable holding the key passphrase.
    #[serde(default = "default_passphrase_env")]
    pub passphrase_env: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            mode: SigningMode::default(),
            key_path: None,
            certificate_path: None,
            passphrase_env: default_passphrase_env(),
        }
    }
}

fn default_passphrase_env() -> String {
    "NFSE_CERT_PASS".to_string()
}

/// Which remote service implementation is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Real SOAP calls to the configured endpoints.
    #[default]
    Live,
    /// In-process service answering with canned successes.
    Simulated,
}

/// Remote service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default)]
    pub mode: ServiceMode,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Namespace of the SOAP operation elements.
    #[serde(default = "default_soap_namespace")]
    pub soap_namespace: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mode: ServiceMode::default(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            soap_namespace: default_soap_namespace(),
        }
    }
}

impl ServiceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_soap_namespace() -> String {
    "http://www.e-nfs.com.br".to_string()
}

/// Status polling budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_secs: default_interval(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_max_attempts() -> u32 {
    20
}

fn default_interval() -> u64 {
    15
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level for the `nfse` crates (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append-only operation log. `None` disables the file layer.
    #[serde(default = "default_operation_log")]
    pub operation_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            operation_log: default_operation_log(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_operation_log() -> Option<PathBuf> {
    Some(PathBuf::from("nfse_orchestrator.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_homologation() {
        let config = NfseConfig::default();
        assert!(config.endpoints.recepcionar_lote_rps.starts_with("https://enfs-hom.abaco.com.br"));
        assert_eq!(config.polling.max_attempts, 20);
        assert_eq!(config.polling.interval(), Duration::from_secs(15));
        assert_eq!(config.service.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.signing.mode, SigningMode::Xmldsig);
        assert_eq!(config.service.mode, ServiceMode::Live);
    }

    #[test]
    fn identity_normalizes_cnpj() {
        let issuer = IssuerConfig {
            cnpj: "32.649.500/0001-45".into(),
            inscricao_municipal: " 123 ".into(),
            codigo_municipio: "2700102".into(),
        };
        let identity = issuer.identity();
        assert_eq!(identity.cnpj, "32649500000145");
        assert_eq!(identity.inscricao_municipal, "123");
    }
}
