// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote municipal web service trait.

use async_trait::async_trait;

use crate::types::{GeneratedInvoice, Protocol, ServiceFailure, StatusReport, SubmissionResult};

/// The three remote operations of an ABRASF municipal web service.
///
/// Implementations never panic on malformed responses; every failure is
/// reported as a [`ServiceFailure`] (or [`SubmissionResult::Failed`]).
#[async_trait]
pub trait InvoiceService: Send + Sync {
    /// Short name used in logs (`abaco`, `simulated`, ...).
    fn name(&self) -> &str;

    /// Submits a signed `EnviarLoteRpsEnvio` document (`RecepcionarLoteRps`).
    async fn submit_batch(&self, signed_xml: &[u8]) -> SubmissionResult;

    /// Queries the processing status of a batch (`ConsultarSituacaoLoteRps`).
    async fn query_status(&self, protocol: &Protocol) -> Result<StatusReport, ServiceFailure>;

    /// Lists the invoices generated for a batch (`ConsultarLoteRps`).
    async fn query_generated_invoices(
        &self,
        protocol: &Protocol,
    ) -> Result<Vec<GeneratedInvoice>, ServiceFailure>;
}
