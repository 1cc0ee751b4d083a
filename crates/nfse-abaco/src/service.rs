// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The live ABRASF service.

use async_trait::async_trait;
use nfse_config::model::EndpointsConfig;
use nfse_core::{
    GeneratedInvoice, InvoiceService, Protocol, ProviderIdentity, ServiceFailure, StatusReport,
    SubmissionResult,
};
use nfse_xml::{lot_query, status_query, Document};
use tracing::{info, warn};

use crate::client::SoapClient;
use crate::responses::{parse_invoices, parse_status, parse_submission};

/// Batch submission operation.
pub const RECEPCIONAR_LOTE_RPS: &str = "RecepcionarLoteRps";
/// Batch status query, answered with a `Situacao` code.
pub const CONSULTAR_SITUACAO_LOTE_RPS: &str = "ConsultarSituacaoLoteRps";
/// Generated invoices of a processed batch.
pub const CONSULTAR_LOTE_RPS: &str = "ConsultarLoteRps";

/// Talks to the municipality's SOAP endpoints.
#[derive(Debug, Clone)]
pub struct AbacoService {
    client: SoapClient,
    endpoints: EndpointsConfig,
    provider: ProviderIdentity,
}

impl AbacoService {
    pub fn new(client: SoapClient, endpoints: EndpointsConfig, provider: ProviderIdentity) -> Self {
        Self {
            client,
            endpoints,
            provider,
        }
    }

    fn query_payload(document: Document) -> Result<String, ServiceFailure> {
        document
            .to_xml_string()
            .map_err(|e| ServiceFailure::parse("PROCESSING_ERROR", e.to_string()))
    }
}

#[async_trait]
impl InvoiceService for AbacoService {
    fn name(&self) -> &str {
        "abaco"
    }

    async fn submit_batch(&self, signed_xml: &[u8]) -> SubmissionResult {
        let payload = match std::str::from_utf8(signed_xml) {
            Ok(payload) => payload,
            Err(e) => {
                return SubmissionResult::Failed(ServiceFailure::parse(
                    "PROCESSING_ERROR",
                    format!("signed batch is not UTF-8: {e}"),
                ));
            }
        };

        let result = match self
            .client
            .call(&self.endpoints.recepcionar_lote_rps, RECEPCIONAR_LOTE_RPS, payload)
            .await
        {
            Ok(body) => parse_submission(&body),
            Err(failure) => SubmissionResult::Failed(failure),
        };

        match &result {
            SubmissionResult::Accepted { protocol, .. } => {
                info!(protocol = ?protocol.as_ref().map(Protocol::as_str), "batch accepted")
            }
            SubmissionResult::Rejected { code, message, .. } => {
                warn!(%code, %message, "batch rejected")
            }
            SubmissionResult::Failed(failure) => warn!(%failure, "batch submission failed"),
        }
        result
    }

    async fn query_status(&self, protocol: &Protocol) -> Result<StatusReport, ServiceFailure> {
        let payload = Self::query_payload(status_query(&self.provider, protocol))?;
        let body = self
            .client
            .call(
                &self.endpoints.consultar_situacao_lote,
                CONSULTAR_SITUACAO_LOTE_RPS,
                &payload,
            )
            .await?;
        parse_status(&body, protocol)
    }

    async fn query_generated_invoices(
        &self,
        protocol: &Protocol,
    ) -> Result<Vec<GeneratedInvoice>, ServiceFailure> {
        let payload = Self::query_payload(lot_query(&self.provider, protocol))?;
        let body = self
            .client
            .call(&self.endpoints.consultar_lote_rps, CONSULTAR_LOTE_RPS, &payload)
            .await?;
        let invoices = parse_invoices(&body)?;
        info!(protocol = %protocol, count = invoices.len(), "generated invoices retrieved");
        Ok(invoices)
    }
}
