// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SOAP 1.1 envelopes around ABRASF documents.
//!
//! The ABRASF document travels as escaped text in the `nfsedadosmsg`
//! parameter; responses carry the answer the same way (or, for some
//! servers, as plain child elements of the response wrapper).

use nfse_core::{NfseError, ServiceFailure};
use nfse_xml::{Document, Element, Node};

pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Builds the request envelope for `operation`.
pub fn request_envelope(
    operation: &str,
    namespace: &str,
    payload: &str,
) -> Result<String, NfseError> {
    let body = Element::new(format!("nfse:{operation}"))
        .with_child(Element::text_element("nfsedadosmsg", payload));

    Document::new(
        Element::new("soapenv:Envelope")
            .with_attribute("xmlns:soapenv", SOAP_ENVELOPE_NAMESPACE)
            .with_attribute("xmlns:nfse", namespace)
            .with_child(Element::new("soapenv:Header"))
            .with_child(Element::new("soapenv:Body").with_child(body)),
    )
    .to_xml_string()
}

/// Fault text when the body is a SOAP fault (1.1 `faultstring` or 1.2 `Reason`).
pub fn fault_message(document: &Document) -> Option<String> {
    let fault = document.root.find("Fault")?;
    let message = fault
        .find_text("faultstring")
        .or_else(|| fault.find("Reason").and_then(|r| r.find_text("Text")))
        .or_else(|| Some(fault.text().trim().to_string()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| "SOAP fault without message".to_string());
    Some(message)
}

/// Unwraps the ABRASF answer from a raw response body.
///
/// Bodies that are not SOAP envelopes are returned as-is.
pub fn extract_payload(body: &str) -> Result<Document, ServiceFailure> {
    let document = Document::parse_str(body).map_err(|e| {
        ServiceFailure::parse("PROCESSING_ERROR", format!("unparseable response: {e}"))
    })?;

    if document.root.local_name() != "Envelope" {
        return Ok(document);
    }

    if let Some(message) = fault_message(&document) {
        return Err(ServiceFailure::soap_fault(message));
    }

    let wrapper = document
        .root
        .child("Body")
        .and_then(|b| b.child_elements().next())
        .ok_or_else(|| {
            ServiceFailure::parse("INVALID_RESPONSE", "SOAP body is empty")
        })?;

    match embedded_xml(wrapper) {
        Some(inner) => Document::parse_str(&inner).map_err(|e| {
            ServiceFailure::parse("PROCESSING_ERROR", format!("unparseable embedded document: {e}"))
        }),
        None => Ok(Document::new(wrapper.clone())),
    }
}

/// Escaped document carried by the wrapper or one of its leaf children.
///
/// Only leaves are considered, so inline answers whose message text
/// happens to start with `<` stay inline.
fn embedded_xml(wrapper: &Element) -> Option<String> {
    std::iter::once(wrapper)
        .chain(wrapper.child_elements())
        .filter(|element| element.child_elements().next().is_none())
        .find_map(|element| {
            element.children.iter().find_map(|node| match node {
                Node::Text(text) if text.trim_start().starts_with('<') => {
                    Some(text.trim().to_string())
                }
                _ => None,
            })
        })
}
