// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A small owned XML tree.
//!
//! Enough structure to build ABRASF documents, insert signature blocks,
//! canonicalize sub-trees, and look up response fields. Names are kept as
//! written (`ds:Signature`), namespace declarations stay ordinary
//! attributes.

use nfse_core::NfseError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Child-index path from the root element to a descendant element.
///
/// The empty path is the root itself.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written (`id`, `xmlns`, `xmlns:ds`).
    pub name: String,
    /// Unescaped value.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// `<name>text</name>`
    pub fn text_element(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn push_element(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Replaces an existing attribute or appends a new one.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First direct child with the given local name.
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.local_name() == local_name)
    }

    pub fn child_mut(&mut self, local_name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(e) if e.local_name() == local_name => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Trimmed text of the first descendant with `local_name`; `None` when
    /// the element is missing or blank.
    pub fn find_text(&self, local_name: &str) -> Option<String> {
        self.find(local_name)
            .map(|e| e.text().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// First element named `local_name` in document order, self included.
    pub fn find(&self, local_name: &str) -> Option<&Element> {
        if self.local_name() == local_name {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find(local_name))
    }

    /// Every element named `local_name` in document order, self included.
    pub fn find_all(&self, local_name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_named(self, local_name, &mut found);
        found
    }

    /// Serializes this element alone, without an XML declaration.
    pub fn to_fragment_string(&self) -> Result<String, NfseError> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner()).map_err(|e| NfseError::Xml(e.to_string()))
    }

    fn child_element_at(&self, index: usize) -> Option<&Element> {
        match self.children.get(index) {
            Some(Node::Element(e)) => Some(e),
            _ => None,
        }
    }

    fn child_element_at_mut(&mut self, index: usize) -> Option<&mut Element> {
        match self.children.get_mut(index) {
            Some(Node::Element(e)) => Some(e),
            _ => None,
        }
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
            Node::Comment(_) => {}
        }
    }
}

fn collect_named<'a>(element: &'a Element, local_name: &str, out: &mut Vec<&'a Element>) {
    if element.local_name() == local_name {
        out.push(element);
    }
    for child in element.child_elements() {
        collect_named(child, local_name, out);
    }
}

/// Splits `ds:Signature` into `(Some("ds"), "Signature")`.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// A parsed or built document: one root element.
///
/// Prolog content other than the XML declaration is not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        path.iter()
            .try_fold(&self.root, |element, &index| element.child_element_at(index))
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        path.iter()
            .try_fold(&mut self.root, |element, &index| element.child_element_at_mut(index))
    }

    /// Paths of every element named `local_name`, in document order.
    pub fn paths_of(&self, local_name: &str) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect_paths(&self.root, &mut path, &mut |e| e.local_name() == local_name, &mut found);
        found
    }

    /// Path of the first element whose `attribute` equals `value`.
    pub fn path_of_id(&self, attribute: &str, value: &str) -> Option<NodePath> {
        self.paths_of_id(attribute, value).into_iter().next()
    }

    /// Paths of every element whose `attribute` equals `value`, in document order.
    pub fn paths_of_id(&self, attribute: &str, value: &str) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect_paths(
            &self.root,
            &mut path,
            &mut |e| e.attribute(attribute) == Some(value),
            &mut found,
        );
        found
    }

    /// Compact serialization with a UTF-8 declaration.
    ///
    /// Empty elements are written as start/end pairs so the output matches
    /// the canonical form element for element.
    pub fn to_bytes(&self) -> Result<Vec<u8>, NfseError> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }

    pub fn to_xml_string(&self) -> Result<String, NfseError> {
        let bytes = self.to_bytes()?;
        String::from_utf8(bytes).map_err(|e| NfseError::Xml(e.to_string()))
    }
}

fn collect_paths(
    element: &Element,
    path: &mut NodePath,
    matches: &mut dyn FnMut(&Element) -> bool,
    found: &mut Vec<NodePath>,
) {
    if matches(element) {
        found.push(path.clone());
    }
    for (index, node) in element.children.iter().enumerate() {
        if let Node::Element(child) = node {
            path.push(index);
            collect_paths(child, path, matches, found);
            path.pop();
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), NfseError> {
    let start = BytesStart::new(element.name.as_str()).with_attributes(
        element
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.value.as_str())),
    );
    writer.write_event(Event::Start(start)).map_err(xml_error)?;

    for node in &element.children {
        match node {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?,
            Node::Comment(text) => writer
                .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                .map_err(xml_error)?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(xml_error)
}

fn xml_error(err: impl std::fmt::Display) -> NfseError {
    NfseError::Xml(err.to_string())
}
