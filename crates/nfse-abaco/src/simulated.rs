// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process stand-in for the municipal service.
//!
//! Accepts every batch, reports it processed, and returns one invoice.
//! Selected with `service.mode = "simulated"`.

use async_trait::async_trait;
use chrono::Local;
use nfse_core::{
    GeneratedInvoice, InvoiceService, ProcessingStatus, Protocol, ServiceFailure, StatusReport,
    SubmissionResult,
};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedService;

#[async_trait]
impl InvoiceService for SimulatedService {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn submit_batch(&self, signed_xml: &[u8]) -> SubmissionResult {
        let protocol = Protocol(format!("TESTE_{}", Local::now().format("%Y%m%d%H%M%S")));
        info!(protocol = %protocol, bytes = signed_xml.len(), "simulated submission");
        SubmissionResult::Accepted {
            raw_response: format!("<Protocolo>{protocol}</Protocolo>"),
            protocol: Some(protocol),
        }
    }

    async fn query_status(&self, protocol: &Protocol) -> Result<StatusReport, ServiceFailure> {
        Ok(StatusReport {
            protocol: protocol.clone(),
            status: ProcessingStatus::Success,
            raw_response: "<Situacao>4</Situacao>".into(),
        })
    }

    async fn query_generated_invoices(
        &self,
        _protocol: &Protocol,
    ) -> Result<Vec<GeneratedInvoice>, ServiceFailure> {
        Ok(vec![GeneratedInvoice {
            number: Some("000000001".into()),
            verification_code: Some("ABC123".into()),
            issued_at: Some("2024-01-01T10:00:00".into()),
            taxable_amount: 1000.0,
            tax_amount: 50.0,
            raw_xml: String::new(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_with_test_protocol() {
        let service = SimulatedService;
        let result = service.submit_batch(b"<x/>").await;
        let protocol = result.protocol().cloned().unwrap();
        assert!(protocol.as_str().starts_with("TESTE_"));
        assert_eq!(protocol.as_str().len(), "TESTE_".len() + 14);

        let report = service.query_status(&protocol).await.unwrap();
        assert_eq!(report.status, ProcessingStatus::Success);

        let invoices = service.query_generated_invoices(&protocol).await.unwrap();
        assert_eq!(invoices[0].number.as_deref(), Some("000000001"));
    }
}
