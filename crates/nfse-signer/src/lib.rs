// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Digital signatures for NFSe batches.
//!
//! [`XmlSigner`] is the seam the workflow signs through. The real
//! implementation is [`XmlDsigSigner`]; [`SkipSigner`] and
//! [`SimulatedSigner`] are chosen by `signing.mode` for homologation runs.

pub mod bypass;
pub mod credential;
pub mod dsig;
pub mod verify;

use std::sync::Arc;

use nfse_config::{NfseConfig, SigningMode};
use nfse_core::NfseError;
use nfse_xml::Document;

pub use bypass::{SimulatedSigner, SkipSigner, SIMULATED_SIGNATURE_COMMENT};
pub use credential::{CredentialSource, SigningCredential};
pub use dsig::{sign_document, XmlDsigSigner};
pub use verify::{verify, VerificationReport};

/// Signs a document in place and returns its serialization.
pub trait XmlSigner: Send + Sync {
    /// `skip`, `simulated`, or `xmldsig`.
    fn mode(&self) -> &'static str;

    fn sign(&self, document: &mut Document) -> Result<Vec<u8>, NfseError>;
}

/// Which elements get signed and how they are referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningStrategy {
    pub inner: String,
    pub outer: String,
    pub id_attribute: String,
}

impl Default for SigningStrategy {
    /// ABRASF: every `InfRps`, then `LoteRps`, referenced by `id`.
    fn default() -> Self {
        Self {
            inner: "InfRps".into(),
            outer: "LoteRps".into(),
            id_attribute: "id".into(),
        }
    }
}

/// Builds the signer selected by `signing.mode`.
///
/// For `xmldsig` the passphrase variable must be set now; the key itself is
/// only read when signing.
pub fn signer_from_config(config: &NfseConfig) -> Result<Arc<dyn XmlSigner>, NfseError> {
    match config.signing.mode {
        SigningMode::Skip => Ok(Arc::new(SkipSigner)),
        SigningMode::Simulated => Ok(Arc::new(SimulatedSigner)),
        SigningMode::Xmldsig => {
            let key_path = config.signing.key_path.clone().ok_or_else(|| {
                NfseError::Config("signing.key_path is required for xmldsig".into())
            })?;
            let certificate_path = config.signing.certificate_path.clone().ok_or_else(|| {
                NfseError::Config("signing.certificate_path is required for xmldsig".into())
            })?;
            let passphrase = nfse_config::signing_passphrase(config)?;
            Ok(Arc::new(XmlDsigSigner::new(
                CredentialSource::new(key_path, certificate_path, passphrase),
                SigningStrategy::default(),
            )))
        }
    }
}
