// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the workflow and its collaborators.
//!
//! Both traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn ...>` and selected once at startup.

pub mod service;
pub mod source;

pub use service::InvoiceService;
pub use source::{BatchNumberSource, InvoiceSource};
