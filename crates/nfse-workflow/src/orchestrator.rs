// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The six-step issuance workflow.
//!
//! Steps run strictly in order:
//! 1. `obter_faturas` - read and validate pending records
//! 2. `construir_xml` - assign a batch number and build `EnviarLoteRpsEnvio`
//! 3. `assinar_xml` - sign on a blocking thread
//! 4. `enviar_lote` - submit once, never retried
//! 5. `polling_status` - wait for a terminal status
//! 6. `obter_resultados` - fetch the generated invoices
//!
//! The first failing step ends the run. Whatever happens, [`Orchestrator::run`]
//! returns a complete [`WorkflowResult`].

use std::sync::Arc;

use nfse_core::{
    Batch, BatchNumberSource, InvoiceRecord, InvoiceService, InvoiceSource, Protocol,
    ProviderIdentity, SubmissionResult,
};
use nfse_signer::XmlSigner;
use nfse_xml::{build_batch, Document};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

use crate::poller::{PollOutcome, PollingPolicy, StatusPoller};
use crate::result::{RunRecorder, WorkflowResult, WorkflowStep};
use crate::retriever::ResultRetriever;
use crate::source::ClockBatchNumbers;

/// Runs the issuance workflow against injected collaborators.
///
/// Cheap to clone; holds no mutable state, so clones can run concurrently
/// on separate tasks.
#[derive(Clone)]
pub struct Orchestrator {
    source: Arc<dyn InvoiceSource>,
    batch_numbers: Arc<dyn BatchNumberSource>,
    signer: Arc<dyn XmlSigner>,
    service: Arc<dyn InvoiceService>,
    provider: ProviderIdentity,
    polling: PollingPolicy,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn InvoiceSource>,
        signer: Arc<dyn XmlSigner>,
        service: Arc<dyn InvoiceService>,
        provider: ProviderIdentity,
    ) -> Self {
        Self {
            source,
            batch_numbers: Arc::new(ClockBatchNumbers::new()),
            signer,
            service,
            provider,
            polling: PollingPolicy::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_batch_numbers(mut self, batch_numbers: Arc<dyn BatchNumberSource>) -> Self {
        self.batch_numbers = batch_numbers;
        self
    }

    pub fn with_polling(mut self, polling: PollingPolicy) -> Self {
        self.polling = polling;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn run(&self) -> WorkflowResult {
        let span = tracing::info_span!(
            "workflow",
            service = self.service.name(),
            signing = self.signer.mode()
        );
        self.run_steps().instrument(span).await
    }

    async fn run_steps(&self) -> WorkflowResult {
        let mut run = RunRecorder::start();
        info!("issuance workflow started");

        let records = match self.fetch_invoices().await {
            Ok(records) => records,
            Err(e) => return fail(run, WorkflowStep::FetchInvoices, e),
        };
        run.complete(WorkflowStep::FetchInvoices);

        let document = match self.build_document(records) {
            Ok(document) => document,
            Err(e) => return fail(run, WorkflowStep::BuildXml, e),
        };
        run.complete(WorkflowStep::BuildXml);

        let signed = match self.sign(document).await {
            Ok(signed) => signed,
            Err(e) => return fail(run, WorkflowStep::SignXml, e),
        };
        run.complete(WorkflowStep::SignXml);

        let protocol = match self.submit(&signed).await {
            Ok(protocol) => protocol,
            Err(e) => return fail(run, WorkflowStep::SubmitBatch, e),
        };
        run.set_protocol(protocol.clone());
        run.complete(WorkflowStep::SubmitBatch);

        let outcome = StatusPoller::new(Arc::clone(&self.service), self.polling, self.shutdown.clone())
            .poll(&protocol)
            .await;
        if !outcome.is_success() {
            return fail(run, WorkflowStep::PollStatus, poll_error(&outcome));
        }
        run.complete(WorkflowStep::PollStatus);

        match ResultRetriever::new(Arc::clone(&self.service))
            .fetch_results(&protocol)
            .await
        {
            Ok(retrieved) => run.set_invoices(retrieved.invoices),
            Err(e) => {
                return fail(
                    run,
                    WorkflowStep::FetchResults,
                    format!("[{}] {e}", e.code()),
                );
            }
        }
        run.complete(WorkflowStep::FetchResults);

        let result = run.succeed();
        info!(
            protocol = %protocol,
            invoices = result.generated_invoices.len(),
            duration_secs = result.duration_secs.unwrap_or_default(),
            "issuance workflow completed"
        );
        result
    }

    async fn fetch_invoices(&self) -> Result<Vec<InvoiceRecord>, String> {
        let records = self
            .source
            .pending_invoices()
            .await
            .map_err(|e| e.to_string())?;
        if records.is_empty() {
            return Err("no pending invoices to process".into());
        }

        let problems: Vec<String> = records.iter().flat_map(InvoiceRecord::validate).collect();
        if !problems.is_empty() {
            return Err(format!("invalid invoice records: {}", problems.join("; ")));
        }

        info!(step = %WorkflowStep::FetchInvoices, records = records.len(), "pending invoices loaded");
        Ok(records)
    }

    fn build_document(&self, records: Vec<InvoiceRecord>) -> Result<Document, String> {
        let batch = Batch::new(
            self.batch_numbers.next_batch_number(),
            self.provider.clone(),
            records,
        );
        let document = build_batch(&batch).map_err(|e| e.to_string())?;
        info!(
            step = %WorkflowStep::BuildXml,
            batch_number = %batch.number,
            records = batch.len(),
            "batch document built"
        );
        Ok(document)
    }

    /// RSA and canonicalization are CPU-bound; keep them off the runtime threads.
    async fn sign(&self, document: Document) -> Result<Vec<u8>, String> {
        let signer = Arc::clone(&self.signer);
        let signed = tokio::task::spawn_blocking(move || {
            let mut document = document;
            signer.sign(&mut document)
        })
        .await
        .map_err(|e| format!("signing task failed: {e}"))?
        .map_err(|e| e.to_string())?;

        info!(step = %WorkflowStep::SignXml, mode = self.signer.mode(), bytes = signed.len(), "batch signed");
        Ok(signed)
    }

    async fn submit(&self, signed: &[u8]) -> Result<Protocol, String> {
        match self.service.submit_batch(signed).await {
            SubmissionResult::Accepted {
                protocol: Some(protocol),
                ..
            } => {
                info!(step = %WorkflowStep::SubmitBatch, protocol = %protocol, "batch accepted");
                Ok(protocol)
            }
            SubmissionResult::Accepted { protocol: None, .. } => {
                Err("protocol not returned by the web service".into())
            }
            SubmissionResult::Rejected { code, message, .. } => {
                Err(format!("batch rejected: [{code}] {message}"))
            }
            SubmissionResult::Failed(failure) => Err(failure.to_string()),
        }
    }
}

fn fail(run: RunRecorder, step: WorkflowStep, message: impl Into<String>) -> WorkflowResult {
    let message = message.into();
    error!(step = %step, error = %message, "issuance workflow failed");
    run.fail(step, message)
}

fn poll_error(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Failed(report) => format!(
            "batch {} was not processed: status {}",
            report.protocol, report.status
        ),
        other => other.to_string(),
    }
}
