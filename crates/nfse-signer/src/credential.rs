// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signing key material.
//!
//! [`CredentialSource`] only remembers where the key lives. Every signing
//! call loads a fresh [`SigningCredential`] and drops it when done; the
//! private key zeroizes itself on drop and file contents are held in
//! `Zeroizing` buffers while decoding.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nfse_core::NfseError;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Where to find the key, its certificate, and the passphrase.
pub struct CredentialSource {
    key_path: PathBuf,
    certificate_path: PathBuf,
    passphrase: SecretString,
}

impl CredentialSource {
    pub fn new(
        key_path: impl Into<PathBuf>,
        certificate_path: impl Into<PathBuf>,
        passphrase: SecretString,
    ) -> Self {
        Self {
            key_path: key_path.into(),
            certificate_path: certificate_path.into(),
            passphrase,
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Reads and decrypts the key and certificate.
    ///
    /// Accepts an `ENCRYPTED PRIVATE KEY` (PKCS#8, decrypted with the
    /// passphrase) or a plain `PRIVATE KEY` PEM.
    pub fn load(&self) -> Result<SigningCredential, NfseError> {
        let key_pem = Zeroizing::new(read_to_string(&self.key_path, "private key")?);

        let private_key = if key_pem.contains("BEGIN ENCRYPTED PRIVATE KEY") {
            RsaPrivateKey::from_pkcs8_encrypted_pem(
                &key_pem,
                self.passphrase.expose_secret().as_bytes(),
            )
            .map_err(|e| NfseError::Credential {
                message: format!(
                    "cannot decrypt {} (wrong passphrase?)",
                    self.key_path.display()
                ),
                source: Some(Box::new(e)),
            })?
        } else {
            warn!(path = %self.key_path.display(), "private key is not encrypted");
            RsaPrivateKey::from_pkcs8_pem(&key_pem).map_err(|e| NfseError::Credential {
                message: format!("cannot decode {}", self.key_path.display()),
                source: Some(Box::new(e)),
            })?
        };

        let certificate_der = read_certificate(&self.certificate_path)?;
        debug!(key = %self.key_path.display(), "signing credential loaded");

        Ok(SigningCredential::new(private_key, certificate_der))
    }
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSource")
            .field("key_path", &self.key_path)
            .field("certificate_path", &self.certificate_path)
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

/// A loaded key with its certificate. Lives for one signing call.
pub struct SigningCredential {
    signing_key: SigningKey<Sha1>,
    public_key: RsaPublicKey,
    certificate_der: Vec<u8>,
}

impl SigningCredential {
    pub fn new(private_key: RsaPrivateKey, certificate_der: Vec<u8>) -> Self {
        let public_key = private_key.to_public_key();
        Self {
            signing_key: SigningKey::<Sha1>::new(private_key),
            public_key,
            certificate_der,
        }
    }

    pub fn signing_key(&self) -> &SigningKey<Sha1> {
        &self.signing_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Base64 DER for `X509Certificate`.
    pub fn certificate_base64(&self) -> String {
        STANDARD.encode(&self.certificate_der)
    }
}

fn read_to_string(path: &Path, what: &str) -> Result<String, NfseError> {
    std::fs::read_to_string(path).map_err(|e| NfseError::Credential {
        message: format!("cannot read {what} at {}", path.display()),
        source: Some(Box::new(e)),
    })
}

/// First `CERTIFICATE` block of a PEM file (chains are allowed).
fn read_certificate(path: &Path) -> Result<Vec<u8>, NfseError> {
    let contents = read_to_string(path, "certificate")?;
    let blocks = pem::parse_many(&contents).map_err(|e| NfseError::Credential {
        message: format!("cannot parse certificate PEM {}", path.display()),
        source: Some(Box::new(e)),
    })?;

    blocks
        .into_iter()
        .find(|block| block.tag() == "CERTIFICATE")
        .map(|block| block.into_contents())
        .ok_or_else(|| {
            NfseError::credential(format!("no CERTIFICATE block in {}", path.display()))
        })
}
