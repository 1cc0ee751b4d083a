// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic `InvoiceService` for workflow tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nfse_core::{
    GeneratedInvoice, InvoiceService, ProcessingStatus, Protocol, ServiceFailure, StatusReport,
    SubmissionResult,
};
use tokio::sync::Mutex;

/// Replays scripted answers.
///
/// Status answers are popped from a FIFO queue; the last one is repeated
/// once the queue is down to a single entry, so `[2]` means "processing
/// forever" and `[2, 2, 4]` stays at 4 for any later query.
pub struct ScriptedService {
    submission: Mutex<SubmissionResult>,
    statuses: Mutex<VecDeque<Result<u8, ServiceFailure>>>,
    invoices: Mutex<Result<Vec<GeneratedInvoice>, ServiceFailure>>,
    submitted: Mutex<Vec<Vec<u8>>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    result_calls: AtomicUsize,
}

impl ScriptedService {
    /// Accepts submissions with `protocol`, reports SUCCESS, generates no invoices.
    pub fn new(protocol: &str) -> Self {
        Self {
            submission: Mutex::new(SubmissionResult::Accepted {
                protocol: Some(Protocol(protocol.to_string())),
                raw_response: format!("<Protocolo>{protocol}</Protocolo>"),
            }),
            statuses: Mutex::new(VecDeque::from([Ok(4)])),
            invoices: Mutex::new(Ok(Vec::new())),
            submitted: Mutex::new(Vec::new()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(self, codes: impl IntoIterator<Item = u8>) -> Self {
        self.with_status_script(codes.into_iter().map(Ok))
    }

    /// Status answers that may include query failures.
    pub fn with_status_script(
        self,
        script: impl IntoIterator<Item = Result<u8, ServiceFailure>>,
    ) -> Self {
        Self {
            statuses: Mutex::new(script.into_iter().collect()),
            ..self
        }
    }

    pub fn with_submission(self, result: SubmissionResult) -> Self {
        Self {
            submission: Mutex::new(result),
            ..self
        }
    }

    pub fn with_invoices(self, invoices: Result<Vec<GeneratedInvoice>, ServiceFailure>) -> Self {
        Self {
            invoices: Mutex::new(invoices),
            ..self
        }
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.submit_calls() + self.status_calls() + self.result_calls()
    }

    /// Every payload passed to `submit_batch`, in order.
    pub async fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().await.clone()
    }

    async fn next_status(&self) -> Result<u8, ServiceFailure> {
        let mut statuses = self.statuses.lock().await;
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        next.unwrap_or(Ok(ProcessingStatus::Processing.code()))
    }
}

#[async_trait]
impl InvoiceService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit_batch(&self, signed_xml: &[u8]) -> SubmissionResult {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().await.push(signed_xml.to_vec());
        self.submission.lock().await.clone()
    }

    async fn query_status(&self, protocol: &Protocol) -> Result<StatusReport, ServiceFailure> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let code = self.next_status().await?;
        let status = ProcessingStatus::from_code(code).ok_or_else(|| {
            ServiceFailure::parse("INVALID_RESPONSE", format!("unknown Situacao {code}"))
        })?;
        Ok(StatusReport {
            protocol: protocol.clone(),
            status,
            raw_response: format!("<Situacao>{code}</Situacao>"),
        })
    }

    async fn query_generated_invoices(
        &self,
        _protocol: &Protocol,
    ) -> Result<Vec<GeneratedInvoice>, ServiceFailure> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.invoices.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_status_repeats() {
        let service = ScriptedService::new("P").with_statuses([2, 4]);
        let protocol = Protocol("P".into());
        let codes: Vec<u8> = {
            let mut codes = Vec::new();
            for _ in 0..3 {
                codes.push(service.query_status(&protocol).await.unwrap().status.code());
            }
            codes
        };
        assert_eq!(codes, vec![2, 4, 4]);
        assert_eq!(service.status_calls(), 3);
    }

    #[tokio::test]
    async fn failures_are_replayed() {
        let service = ScriptedService::new("P")
            .with_status_script([Err(ServiceFailure::transport("down")), Ok(4)]);
        let protocol = Protocol("P".into());
        assert!(service.query_status(&protocol).await.is_err());
        assert!(service.query_status(&protocol).await.is_ok());
    }

    #[tokio::test]
    async fn submissions_are_captured() {
        let service = ScriptedService::new("P");
        let result = service.submit_batch(b"<a/>").await;
        assert!(result.is_accepted());
        assert_eq!(service.submitted().await, vec![b"<a/>".to_vec()]);
        assert_eq!(service.total_calls(), 1);
    }
}
