// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! XML support for the NFSe batch issuer.
//!
//! An owned element tree ([`Document`]) with a quick-xml parser and compact
//! serializer, inclusive Canonical XML 1.0, and builders for the ABRASF
//! batch and query documents.

pub mod batch;
pub mod c14n;
pub mod dom;
mod parse;

pub use batch::{build_batch, lot_query, status_query};
pub use c14n::{canonicalize, canonicalize_excluding, C14N_ALGORITHM};
pub use dom::{Attribute, Document, Element, Node, NodePath};
