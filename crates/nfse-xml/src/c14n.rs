// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical XML 1.0 (inclusive, without comments).
//!
//! Canonicalizes one element sub-tree in the context of its document:
//! namespace declarations and `xml:*` attributes in scope at the apex are
//! rendered on it even when declared on an ancestor. This is what the
//! XML-DSig digest and `SignedInfo` signature are computed over.

use std::collections::BTreeMap;

use nfse_core::NfseError;

use crate::dom::{split_qname, Document, Element, Node, NodePath};

pub const C14N_ALGORITHM: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix to URI; the default namespace uses the empty prefix.
type Scope = BTreeMap<String, String>;

/// Canonical form of the element at `path`.
pub fn canonicalize(doc: &Document, path: &[usize]) -> Result<String, NfseError> {
    canonicalize_excluding(doc, path, None)
}

/// Canonical form of the element at `path`, leaving out the sub-tree at
/// `exclude` (the enveloped-signature transform).
pub fn canonicalize_excluding(
    doc: &Document,
    path: &[usize],
    exclude: Option<&[usize]>,
) -> Result<String, NfseError> {
    let target = doc
        .element_at(path)
        .ok_or_else(|| NfseError::Xml(format!("no element at path {path:?}")))?;

    let mut scope = Scope::new();
    let mut inherited_xml_attrs: BTreeMap<String, String> = BTreeMap::new();
    for depth in 0..path.len() {
        let ancestor = doc
            .element_at(&path[..depth])
            .ok_or_else(|| NfseError::Xml(format!("no element at path {path:?}")))?;
        declare_namespaces(ancestor, &mut scope);
        for attr in &ancestor.attributes {
            if attr.name.starts_with("xml:") {
                inherited_xml_attrs.insert(attr.name.clone(), attr.value.clone());
            }
        }
    }

    // xml:* attributes of the apex itself win over inherited ones.
    inherited_xml_attrs.retain(|name, _| target.attribute(name).is_none());

    let mut writer = Canonicalizer {
        out: String::new(),
        exclude,
    };
    let mut current: NodePath = path.to_vec();
    writer.element(target, &mut current, &scope, &Scope::new(), &inherited_xml_attrs)?;
    Ok(writer.out)
}

struct Canonicalizer<'a> {
    out: String,
    exclude: Option<&'a [usize]>,
}

impl Canonicalizer<'_> {
    fn element(
        &mut self,
        element: &Element,
        path: &mut NodePath,
        base: &Scope,
        rendered_parent: &Scope,
        extra_attrs: &BTreeMap<String, String>,
    ) -> Result<(), NfseError> {
        let mut scope = base.clone();
        declare_namespaces(element, &mut scope);

        self.out.push('<');
        self.out.push_str(&element.name);

        // Namespace nodes: default first, then by prefix (BTreeMap order).
        for (prefix, uri) in &scope {
            if prefix == "xml" {
                continue;
            }
            let parent_uri = rendered_parent.get(prefix).map(String::as_str).unwrap_or("");
            if uri == parent_uri {
                continue;
            }
            if prefix.is_empty() {
                self.out.push_str(" xmlns=\"");
            } else {
                self.out.push_str(" xmlns:");
                self.out.push_str(prefix);
                self.out.push_str("=\"");
            }
            escape_attribute(uri, &mut self.out);
            self.out.push('"');
        }
        // An undeclared default under a declared one must be rendered as xmlns="".
        if !scope.contains_key("")
            && rendered_parent.get("").is_some_and(|uri| !uri.is_empty())
        {
            self.out.push_str(" xmlns=\"\"");
        }

        let mut attributes: Vec<(String, &str, &str, &str)> = Vec::new();
        for attr in &element.attributes {
            if is_namespace_declaration(&attr.name) {
                continue;
            }
            attributes.push(sort_key(&attr.name, &attr.value, &scope)?);
        }
        for (name, value) in extra_attrs {
            attributes.push(sort_key(name, value, &scope)?);
        }
        attributes.sort_by(|a, b| (a.0.as_str(), a.1).cmp(&(b.0.as_str(), b.1)));

        for (_, _, name, value) in attributes {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            escape_attribute(value, &mut self.out);
            self.out.push('"');
        }
        self.out.push('>');

        let no_extra = BTreeMap::new();
        for (index, node) in element.children.iter().enumerate() {
            match node {
                Node::Element(child) => {
                    path.push(index);
                    if self.exclude != Some(path.as_slice()) {
                        self.element(child, path, &scope, &scope, &no_extra)?;
                    }
                    path.pop();
                }
                Node::Text(text) => escape_text(text, &mut self.out),
                Node::Comment(_) => {}
            }
        }

        self.out.push_str("</");
        self.out.push_str(&element.name);
        self.out.push('>');
        Ok(())
    }
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

fn declare_namespaces(element: &Element, scope: &mut Scope) {
    for attr in &element.attributes {
        if attr.name == "xmlns" {
            if attr.value.is_empty() {
                scope.remove("");
            } else {
                scope.insert(String::new(), attr.value.clone());
            }
        } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
            scope.insert(prefix.to_string(), attr.value.clone());
        }
    }
}

/// `(namespace URI, local name, qualified name, value)`
fn sort_key<'a>(
    name: &'a str,
    value: &'a str,
    scope: &Scope,
) -> Result<(String, &'a str, &'a str, &'a str), NfseError> {
    let (prefix, local) = split_qname(name);
    let uri = match prefix {
        None => String::new(),
        Some("xml") => XML_NAMESPACE.to_string(),
        Some(p) => scope
            .get(p)
            .cloned()
            .ok_or_else(|| NfseError::Xml(format!("undeclared namespace prefix `{p}`")))?,
    };
    Ok((uri, local, name, value))
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Document {
        Document::parse_str(xml).unwrap()
    }

    #[test]
    fn apex_carries_inherited_namespaces() {
        let doc = parse(r#"<r xmlns="urn:r" xmlns:b="urn:b"><x id="1"><y/></x></r>"#);
        let c14n = canonicalize(&doc, &[0]).unwrap();
        assert_eq!(
            c14n,
            r#"<x xmlns="urn:r" xmlns:b="urn:b" id="1"><y></y></x>"#
        );
    }

    #[test]
    fn descendants_only_render_changed_namespaces() {
        let doc = parse(
            r#"<r xmlns="urn:r"><s xmlns="urn:s"><t xmlns="urn:s"/></s><u xmlns=""/></r>"#,
        );
        assert_eq!(
            canonicalize(&doc, &[]).unwrap(),
            r#"<r xmlns="urn:r"><s xmlns="urn:s"><t></t></s><u xmlns=""></u></r>"#
        );
    }

    #[test]
    fn attributes_sort_by_namespace_then_name() {
        let doc = parse(r#"<e xmlns:z="urn:a" xmlns:a="urn:z" b="1" a:x="2" z:y="3" a="4"/>"#);
        assert_eq!(
            canonicalize(&doc, &[]).unwrap(),
            r#"<e xmlns:a="urn:z" xmlns:z="urn:a" a="4" b="1" z:y="3" a:x="2"></e>"#
        );
    }

    #[test]
    fn escaping_rules() {
        let doc = parse("<e v=\"&lt;&amp;&quot;&#9;&#10;\">a&amp;b&lt;c&gt;d&#13;</e>");
        assert_eq!(
            canonicalize(&doc, &[]).unwrap(),
            "<e v=\"&lt;&amp;&quot;&#x9;&#xA;\">a&amp;b&lt;c&gt;d&#xD;</e>"
        );
    }

    #[test]
    fn comments_are_dropped_and_whitespace_kept() {
        let doc = parse("<e>\n  <!-- c --><f> x </f>\n</e>");
        assert_eq!(canonicalize(&doc, &[]).unwrap(), "<e>\n  <f> x </f>\n</e>");
    }

    #[test]
    fn excluded_subtree_is_skipped() {
        let doc = parse("<e><keep/><drop><x/></drop></e>");
        assert_eq!(
            canonicalize_excluding(&doc, &[], Some(&[1])).unwrap(),
            "<e><keep></keep></e>"
        );
    }

    #[test]
    fn inherited_xml_attributes_are_rendered() {
        let doc = parse(r#"<r xml:lang="pt"><x a="1"/></r>"#);
        assert_eq!(
            canonicalize(&doc, &[0]).unwrap(),
            r#"<x a="1" xml:lang="pt"></x>"#
        );
    }

    #[test]
    fn missing_path_is_an_error() {
        let doc = parse("<e/>");
        assert!(canonicalize(&doc, &[3]).is_err());
    }
}
