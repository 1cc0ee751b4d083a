// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enveloped XML-DSig over ABRASF batches.
//!
//! Signing happens in two phases. Every inner element (`InfRps`) is signed
//! first, in document order, with its `Signature` appended to the element's
//! parent. Then the outer element (`LoteRps`) is signed, its `Signature`
//! appended to the document root. The outer digest therefore covers the
//! inner signatures.
//!
//! Each `Signature` is inserted as a template before any digest is taken,
//! and `SignedInfo` is canonicalized where it sits in the document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nfse_core::NfseError;
use nfse_xml::{canonicalize, canonicalize_excluding, Document, Element, Node, NodePath, C14N_ALGORITHM};
use rsa::signature::{SignatureEncoding, Signer};
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use crate::credential::{CredentialSource, SigningCredential};
use crate::{SigningStrategy, XmlSigner};

pub const DSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const SHA1_DIGEST: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Signs with an RSA key loaded fresh for every call.
#[derive(Debug)]
pub struct XmlDsigSigner {
    credentials: CredentialSource,
    strategy: SigningStrategy,
}

impl XmlDsigSigner {
    pub fn new(credentials: CredentialSource, strategy: SigningStrategy) -> Self {
        Self {
            credentials,
            strategy,
        }
    }
}

impl XmlSigner for XmlDsigSigner {
    fn mode(&self) -> &'static str {
        "xmldsig"
    }

    fn sign(&self, document: &mut Document) -> Result<Vec<u8>, NfseError> {
        let credential = self.credentials.load()?;
        sign_document(document, &self.strategy, &credential)?;
        document.to_bytes()
    }
}

/// Applies both signature phases in place.
///
/// Targets are checked before anything is inserted, so a missing outer
/// element or id leaves the document untouched.
pub fn sign_document(
    document: &mut Document,
    strategy: &SigningStrategy,
    credential: &SigningCredential,
) -> Result<(), NfseError> {
    let outer_path = document
        .paths_of(&strategy.outer)
        .into_iter()
        .next()
        .ok_or_else(|| {
            NfseError::Signature(format!("element `{}` not found", strategy.outer))
        })?;
    let outer_id = target_id(document, &outer_path, strategy)?;

    let inner_ids = document
        .paths_of(&strategy.inner)
        .iter()
        .map(|path| target_id(document, path, strategy))
        .collect::<Result<Vec<_>, _>>()?;

    for id in &inner_ids {
        let path = document
            .path_of_id(&strategy.id_attribute, id)
            .ok_or_else(|| NfseError::Signature(format!("element #{id} disappeared")))?;
        let parent = parent_of(&path)?;
        sign_element(document, &path, &parent, id, credential)?;
    }
    debug!(count = inner_ids.len(), element = %strategy.inner, "inner signatures applied");

    let outer_path = document
        .path_of_id(&strategy.id_attribute, &outer_id)
        .ok_or_else(|| NfseError::Signature(format!("element #{outer_id} disappeared")))?;
    sign_element(document, &outer_path, &[], &outer_id, credential)?;

    info!(
        inner = inner_ids.len(),
        outer = %outer_id,
        "document signed"
    );
    Ok(())
}

fn target_id(
    document: &Document,
    path: &[usize],
    strategy: &SigningStrategy,
) -> Result<String, NfseError> {
    let element = document
        .element_at(path)
        .ok_or_else(|| NfseError::Signature(format!("no element at {path:?}")))?;
    element
        .attribute(&strategy.id_attribute)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            NfseError::Signature(format!(
                "`{}` has no `{}` attribute",
                element.name, strategy.id_attribute
            ))
        })
}

fn parent_of(path: &[usize]) -> Result<NodePath, NfseError> {
    match path.split_last() {
        Some((_, parent)) => Ok(parent.to_vec()),
        None => Err(NfseError::Signature(
            "the document root cannot be an inner signing target".into(),
        )),
    }
}

/// Signs the element at `target`, appending the `Signature` to `container`.
fn sign_element(
    document: &mut Document,
    target: &[usize],
    container: &[usize],
    id: &str,
    credential: &SigningCredential,
) -> Result<(), NfseError> {
    let signature_path = {
        let parent = document
            .element_at_mut(container)
            .ok_or_else(|| NfseError::Signature(format!("no container for #{id}")))?;
        parent.push_element(signature_template(id));
        let mut path = container.to_vec();
        path.push(parent.children.len() - 1);
        path
    };

    let canonical = canonicalize_excluding(document, target, Some(&signature_path))?;
    let digest = STANDARD.encode(Sha1::digest(canonical.as_bytes()));

    let signature = document
        .element_at_mut(&signature_path)
        .ok_or_else(|| NfseError::Signature(format!("signature for #{id} vanished")))?;
    set_text(signature, &["SignedInfo", "Reference", "DigestValue"], digest)?;

    let mut signed_info_path = signature_path.clone();
    signed_info_path.push(0);
    let signed_info = canonicalize(document, &signed_info_path)?;

    let value = credential
        .signing_key()
        .try_sign(signed_info.as_bytes())
        .map_err(|e| NfseError::Signature(format!("RSA signing of #{id} failed: {e}")))?;

    let signature = document
        .element_at_mut(&signature_path)
        .ok_or_else(|| NfseError::Signature(format!("signature for #{id} vanished")))?;
    set_text(signature, &["SignatureValue"], STANDARD.encode(value.to_bytes()))?;
    set_text(
        signature,
        &["KeyInfo", "X509Data", "X509Certificate"],
        credential.certificate_base64(),
    )?;

    debug!(reference = %id, "element signed");
    Ok(())
}

/// `Signature` with empty `DigestValue`, `SignatureValue`, `X509Certificate`.
///
/// `SignedInfo` must stay the first child; its path is derived from that.
fn signature_template(id: &str) -> Element {
    let reference = Element::new("Reference")
        .with_attribute("URI", format!("#{id}"))
        .with_child(
            Element::new("Transforms")
                .with_child(Element::new("Transform").with_attribute("Algorithm", ENVELOPED_SIGNATURE))
                .with_child(Element::new("Transform").with_attribute("Algorithm", C14N_ALGORITHM)),
        )
        .with_child(Element::new("DigestMethod").with_attribute("Algorithm", SHA1_DIGEST))
        .with_child(Element::new("DigestValue"));

    Element::new("Signature")
        .with_attribute("xmlns", DSIG_NAMESPACE)
        .with_child(
            Element::new("SignedInfo")
                .with_child(
                    Element::new("CanonicalizationMethod").with_attribute("Algorithm", C14N_ALGORITHM),
                )
                .with_child(Element::new("SignatureMethod").with_attribute("Algorithm", RSA_SHA1))
                .with_child(reference),
        )
        .with_child(Element::new("SignatureValue"))
        .with_child(
            Element::new("KeyInfo")
                .with_child(Element::new("X509Data").with_child(Element::new("X509Certificate"))),
        )
}

fn set_text(root: &mut Element, path: &[&str], text: String) -> Result<(), NfseError> {
    let mut element = root;
    for name in path {
        element = element
            .child_mut(name)
            .ok_or_else(|| NfseError::Signature(format!("signature template lacks `{name}`")))?;
    }
    element.children = vec![Node::Text(text)];
    Ok(())
}
