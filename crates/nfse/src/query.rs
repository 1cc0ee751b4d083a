// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nfse status` and `nfse results` for an already-submitted batch.
//!
//! Both print a JSON object and report whether the query succeeded so the
//! caller can pick the exit code.

use std::sync::Arc;

use nfse_core::{InvoiceService, Protocol};
use nfse_workflow::ResultRetriever;
use serde_json::{json, Value};

pub async fn query_status(service: &dyn InvoiceService, protocol: &Protocol) -> (Value, bool) {
    match service.query_status(protocol).await {
        Ok(report) => (
            json!({
                "sucesso": true,
                "protocolo": protocol,
                "situacao": report.status.code(),
                "descricao": report.status.description(),
            }),
            true,
        ),
        Err(failure) => (
            json!({
                "sucesso": false,
                "protocolo": protocol,
                "codigo": failure.code,
                "erro": failure.message,
            }),
            false,
        ),
    }
}

pub async fn query_results(service: Arc<dyn InvoiceService>, protocol: &Protocol) -> (Value, bool) {
    match ResultRetriever::new(service).fetch_results(protocol).await {
        Ok(result) => (
            json!({
                "sucesso": true,
                "protocolo": protocol,
                "nfse": result.invoices,
                "total": result.total,
            }),
            true,
        ),
        Err(e) => (
            json!({
                "sucesso": false,
                "protocolo": protocol,
                "codigo": e.code(),
                "erro": e.to_string(),
            }),
            false,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfse_core::ServiceFailure;
    use nfse_test_utils::fixtures::generated_invoice;
    use nfse_test_utils::ScriptedService;

    fn protocol() -> Protocol {
        Protocol("987654".into())
    }

    #[tokio::test]
    async fn status_reports_code_and_description() {
        let service = ScriptedService::new("987654").with_statuses([2]);

        let (json, ok) = query_status(&service, &protocol()).await;

        assert!(ok);
        assert_eq!(json["situacao"], 2);
        assert_eq!(json["descricao"], "Processando");
        assert_eq!(json["protocolo"], "987654");
    }

    #[tokio::test]
    async fn status_failure_carries_code() {
        let service = ScriptedService::new("987654")
            .with_status_script([Err(ServiceFailure::timeout("request timed out"))]);

        let (json, ok) = query_status(&service, &protocol()).await;

        assert!(!ok);
        assert_eq!(json["codigo"], "TIMEOUT");
    }

    #[tokio::test]
    async fn results_list_invoices() {
        let service = Arc::new(
            ScriptedService::new("987654").with_invoices(Ok(vec![generated_invoice("000000007")])),
        );

        let (json, ok) = query_results(service, &protocol()).await;

        assert!(ok);
        assert_eq!(json["total"], 1);
        assert_eq!(json["nfse"][0]["numero"], "000000007");
        assert_eq!(json["nfse"][0]["codigo_verificacao"], "ABC123");
    }

    #[tokio::test]
    async fn results_before_processing_are_refused() {
        let service = Arc::new(ScriptedService::new("987654").with_statuses([1]));

        let (json, ok) = query_results(service, &protocol()).await;

        assert!(!ok);
        assert_eq!(json["codigo"], "LOTE_NOT_PROCESSED");
    }
}
