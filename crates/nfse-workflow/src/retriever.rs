// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetches the invoices generated for a processed batch.

use std::sync::Arc;

use nfse_core::{GeneratedInvoice, InvoiceService, ProcessingStatus, Protocol, ServiceFailure};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Invoices generated for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    #[serde(rename = "nfse")]
    pub invoices: Vec<GeneratedInvoice>,
    pub total: usize,
}

impl RetrievalResult {
    pub fn new(invoices: Vec<GeneratedInvoice>) -> Self {
        let total = invoices.len();
        Self { invoices, total }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    #[error("batch not processed yet (status {0})")]
    NotProcessed(ProcessingStatus),

    #[error("status check failed: {0}")]
    StatusCheck(ServiceFailure),

    #[error("invoice retrieval failed: {0}")]
    Retrieval(ServiceFailure),
}

impl RetrievalError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotProcessed(_) => "LOTE_NOT_PROCESSED",
            Self::StatusCheck(_) => "STATUS_CHECK_ERROR",
            Self::Retrieval(_) => "NFSE_RETRIEVAL_ERROR",
        }
    }
}

/// Confirms SUCCESS before asking for the generated invoices.
#[derive(Clone)]
pub struct ResultRetriever {
    service: Arc<dyn InvoiceService>,
}

impl ResultRetriever {
    pub fn new(service: Arc<dyn InvoiceService>) -> Self {
        Self { service }
    }

    pub async fn fetch_results(&self, protocol: &Protocol) -> Result<RetrievalResult, RetrievalError> {
        let report = self
            .service
            .query_status(protocol)
            .await
            .map_err(RetrievalError::StatusCheck)?;
        if report.status != ProcessingStatus::Success {
            warn!(protocol = %protocol, status = %report.status, "results requested before processing finished");
            return Err(RetrievalError::NotProcessed(report.status));
        }

        let invoices = self
            .service
            .query_generated_invoices(protocol)
            .await
            .map_err(RetrievalError::Retrieval)?;

        info!(protocol = %protocol, total = invoices.len(), "generated invoices retrieved");
        Ok(RetrievalResult::new(invoices))
    }
}
