// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checks every `Signature` block of a signed document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nfse_core::NfseError;
use nfse_xml::{canonicalize, canonicalize_excluding, Document, Element};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::dsig::{RSA_SHA1, SHA1_DIGEST};

/// What a successful verification covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Referenced ids in document order (`rps_1`, ..., `lote_...`).
    pub references: Vec<String>,
}

/// Verifies a document whose signatures reference elements by `id`.
pub fn verify(signed: &[u8], public_key: &RsaPublicKey) -> Result<VerificationReport, NfseError> {
    verify_with_id_attribute(signed, public_key, "id")
}

pub fn verify_with_id_attribute(
    signed: &[u8],
    public_key: &RsaPublicKey,
    id_attribute: &str,
) -> Result<VerificationReport, NfseError> {
    let document = Document::parse(signed)?;
    let verifying_key = VerifyingKey::<Sha1>::new(public_key.clone());

    let signature_paths = document.paths_of("Signature");
    if signature_paths.is_empty() {
        return Err(NfseError::Signature("document carries no signatures".into()));
    }

    let mut references = Vec::with_capacity(signature_paths.len());
    for signature_path in signature_paths {
        let signature = document
            .element_at(&signature_path)
            .ok_or_else(|| NfseError::Signature("signature path vanished".into()))?;

        let id = reference_id(signature)?;
        check_algorithm(signature, "SignatureMethod", RSA_SHA1)?;
        check_algorithm(signature, "DigestMethod", SHA1_DIGEST)?;

        let target = match document.paths_of_id(id_attribute, &id).as_slice() {
            [] => return Err(NfseError::Signature(format!("reference #{id} not found"))),
            [only] => only.clone(),
            many => {
                return Err(NfseError::Signature(format!(
                    "reference #{id} is ambiguous: {} elements carry it",
                    many.len()
                )));
            }
        };

        let canonical = canonicalize_excluding(&document, &target, Some(&signature_path))?;
        let expected = decode(signature, "DigestValue")?;
        if Sha1::digest(canonical.as_bytes()).as_slice() != expected.as_slice() {
            return Err(NfseError::Signature(format!("digest mismatch for #{id}")));
        }

        let signed_info_index = signature
            .children
            .iter()
            .position(|node| matches!(node, nfse_xml::Node::Element(e) if e.local_name() == "SignedInfo"))
            .ok_or_else(|| NfseError::Signature(format!("signature for #{id} lacks SignedInfo")))?;
        let mut signed_info_path = signature_path.clone();
        signed_info_path.push(signed_info_index);
        let signed_info = canonicalize(&document, &signed_info_path)?;

        let value = decode(signature, "SignatureValue")?;
        let value = Signature::try_from(value.as_slice())
            .map_err(|e| NfseError::Signature(format!("malformed SignatureValue for #{id}: {e}")))?;
        verifying_key
            .verify(signed_info.as_bytes(), &value)
            .map_err(|_| NfseError::Signature(format!("signature mismatch for #{id}")))?;

        debug!(reference = %id, "signature verified");
        references.push(id);
    }

    Ok(VerificationReport { references })
}

fn reference_id(signature: &Element) -> Result<String, NfseError> {
    signature
        .find("Reference")
        .and_then(|r| r.attribute("URI"))
        .and_then(|uri| uri.strip_prefix('#'))
        .map(str::to_string)
        .ok_or_else(|| NfseError::Signature("signature without a `#id` reference".into()))
}

fn check_algorithm(signature: &Element, element: &str, expected: &str) -> Result<(), NfseError> {
    let found = signature.find(element).and_then(|e| e.attribute("Algorithm"));
    if found == Some(expected) {
        Ok(())
    } else {
        Err(NfseError::Signature(format!(
            "unsupported {element} {}",
            found.unwrap_or("<missing>")
        )))
    }
}

fn decode(signature: &Element, element: &str) -> Result<Vec<u8>, NfseError> {
    let text = signature
        .find_text(element)
        .ok_or_else(|| NfseError::Signature(format!("empty {element}")))?;
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| NfseError::Signature(format!("invalid base64 in {element}: {e}")))
}
