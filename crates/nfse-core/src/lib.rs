// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the NFSe batch issuer.
//!
//! Invoice records, remote-service outcome types, the error type, and the
//! traits implemented by the web-service client and the invoice sources.

pub mod error;
pub mod taxid;
pub mod traits;
pub mod types;

pub use error::NfseError;
pub use traits::{BatchNumberSource, InvoiceService, InvoiceSource};
pub use types::{
    Address, Batch, BatchNumber, FailureKind, GeneratedInvoice, InvoiceRecord, Payer,
    ProcessingStatus, Protocol, ProviderIdentity, ServiceFailure, StatusReport, SubmissionResult,
};

/// ABRASF NFSe schema namespace used by every request and response document.
pub const ABRASF_NAMESPACE: &str = "http://www.abrasf.org.br/nfse.xsd";
