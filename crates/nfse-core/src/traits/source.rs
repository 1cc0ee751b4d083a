// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoice and batch-number source traits.

use async_trait::async_trait;

use crate::error::NfseError;
use crate::types::{BatchNumber, InvoiceRecord};

/// Supplies the records pending invoice issuance.
#[async_trait]
pub trait InvoiceSource: Send + Sync {
    async fn pending_invoices(&self) -> Result<Vec<InvoiceRecord>, NfseError>;
}

/// Produces batch numbers; one call per submission attempt.
pub trait BatchNumberSource: Send + Sync {
    fn next_batch_number(&self) -> BatchNumber;
}
