// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signers for homologation runs without a certificate.

use nfse_core::NfseError;
use nfse_xml::{Document, Node};
use tracing::warn;

use crate::XmlSigner;

pub const SIMULATED_SIGNATURE_COMMENT: &str = " ASSINATURA DIGITAL SIMULADA - MODO TESTE ";

/// Returns the document unsigned.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipSigner;

impl XmlSigner for SkipSigner {
    fn mode(&self) -> &'static str {
        "skip"
    }

    fn sign(&self, document: &mut Document) -> Result<Vec<u8>, NfseError> {
        warn!("signature skipped; the batch is sent unsigned");
        document.to_bytes()
    }
}

/// Marks the document with a comment in place of signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedSigner;

impl XmlSigner for SimulatedSigner {
    fn mode(&self) -> &'static str {
        "simulated"
    }

    fn sign(&self, document: &mut Document) -> Result<Vec<u8>, NfseError> {
        warn!("simulated signature; the batch carries no real signature");
        document
            .root
            .children
            .insert(0, Node::Comment(SIMULATED_SIGNATURE_COMMENT.to_string()));
        document.to_bytes()
    }
}
