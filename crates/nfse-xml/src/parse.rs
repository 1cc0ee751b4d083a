// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing bytes into a [`Document`] with quick-xml.

use nfse_core::NfseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::dom::{Attribute, Document, Element, Node};

impl Document {
    /// Parses a complete document.
    ///
    /// Whitespace text is preserved so signed content survives a round trip.
    /// Content before or after the root element is dropped.
    pub fn parse(bytes: &[u8]) -> Result<Self, NfseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| position_error(&reader, e))?;

            match event {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| NfseError::Xml("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = text
                            .unescape()
                            .map_err(|e| position_error(&reader, e))?;
                        push_text(parent, &value);
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = std::str::from_utf8(&data)
                            .map_err(|e| NfseError::Xml(e.to_string()))?;
                        push_text(parent, value);
                    }
                }
                Event::Comment(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = std::str::from_utf8(&text)
                            .map_err(|e| NfseError::Xml(e.to_string()))?;
                        parent.children.push(Node::Comment(value.to_string()));
                    }
                }
                Event::Eof => break,
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(NfseError::Xml("unexpected end of document".into()));
        }
        root.map(Document::new)
            .ok_or_else(|| NfseError::Xml("document has no root element".into()))
    }

    pub fn parse_str(xml: &str) -> Result<Self, NfseError> {
        Self::parse(xml.as_bytes())
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, NfseError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| NfseError::Xml(e.to_string()))?
        .to_string();

    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| NfseError::Xml(e.to_string()))?;
        let name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| NfseError::Xml(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| NfseError::Xml(e.to_string()))?
            .into_owned();
        element.attributes.push(Attribute { name, value });
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), NfseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(NfseError::Xml("multiple root elements".into())),
    }
    Ok(())
}

/// Adjacent text and CDATA merge into one node.
fn push_text(parent: &mut Element, value: &str) {
    if let Some(Node::Text(existing)) = parent.children.last_mut() {
        existing.push_str(value);
    } else {
        parent.children.push(Node::Text(value.to_string()));
    }
}

fn position_error(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> NfseError {
    NfseError::Xml(format!("at byte {}: {err}", reader.buffer_position()))
}
