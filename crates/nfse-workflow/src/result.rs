// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report returned by every workflow run.

use std::time::Instant;

use chrono::{DateTime, Local};
use nfse_core::{GeneratedInvoice, Protocol};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Workflow steps in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr, Serialize,
)]
pub enum WorkflowStep {
    #[strum(serialize = "obter_faturas")]
    #[serde(rename = "obter_faturas")]
    FetchInvoices,
    #[strum(serialize = "construir_xml")]
    #[serde(rename = "construir_xml")]
    BuildXml,
    #[strum(serialize = "assinar_xml")]
    #[serde(rename = "assinar_xml")]
    SignXml,
    #[strum(serialize = "enviar_lote")]
    #[serde(rename = "enviar_lote")]
    SubmitBatch,
    #[strum(serialize = "polling_status")]
    #[serde(rename = "polling_status")]
    PollStatus,
    #[strum(serialize = "obter_resultados")]
    #[serde(rename = "obter_resultados")]
    FetchResults,
}

/// Outcome of one run, serialized as the operator-facing JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    #[serde(rename = "sucesso")]
    pub success: bool,
    #[serde(rename = "inicio")]
    pub started_at: DateTime<Local>,
    #[serde(rename = "fim")]
    pub finished_at: Option<DateTime<Local>>,
    #[serde(rename = "duracao_segundos")]
    pub duration_secs: Option<f64>,
    #[serde(rename = "etapas_concluidas")]
    pub completed_steps: Vec<WorkflowStep>,
    #[serde(rename = "protocolo")]
    pub protocol: Option<Protocol>,
    #[serde(rename = "nfse_geradas")]
    pub generated_invoices: Vec<GeneratedInvoice>,
    #[serde(rename = "erros")]
    pub errors: Vec<String>,
}

impl WorkflowResult {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Accumulates a [`WorkflowResult`] while the steps run.
///
/// Duration comes from a monotonic clock; the timestamps are wall-clock.
pub(crate) struct RunRecorder {
    result: WorkflowResult,
    started: Instant,
}

impl RunRecorder {
    pub(crate) fn start() -> Self {
        Self {
            result: WorkflowResult {
                success: false,
                started_at: Local::now(),
                finished_at: None,
                duration_secs: None,
                completed_steps: Vec::new(),
                protocol: None,
                generated_invoices: Vec::new(),
                errors: Vec::new(),
            },
            started: Instant::now(),
        }
    }

    pub(crate) fn complete(&mut self, step: WorkflowStep) {
        self.result.completed_steps.push(step);
    }

    pub(crate) fn set_protocol(&mut self, protocol: Protocol) {
        self.result.protocol = Some(protocol);
    }

    pub(crate) fn set_invoices(&mut self, invoices: Vec<GeneratedInvoice>) {
        self.result.generated_invoices = invoices;
    }

    pub(crate) fn fail(mut self, step: WorkflowStep, error: impl Into<String>) -> WorkflowResult {
        self.result.errors.push(format!("{step}: {}", error.into()));
        self.finish(false)
    }

    pub(crate) fn succeed(self) -> WorkflowResult {
        self.finish(true)
    }

    fn finish(mut self, success: bool) -> WorkflowResult {
        self.result.success = success;
        self.result.finished_at = Some(Local::now());
        self.result.duration_secs = Some(self.started.elapsed().as_secs_f64());
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn step_names_in_order() {
        let names: Vec<String> = WorkflowStep::iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "obter_faturas",
                "construir_xml",
                "assinar_xml",
                "enviar_lote",
                "polling_status",
                "obter_resultados"
            ]
        );
        assert_eq!("enviar_lote".parse::<WorkflowStep>().unwrap(), WorkflowStep::SubmitBatch);
    }

    #[test]
    fn failure_is_stamped_and_prefixed() {
        let mut run = RunRecorder::start();
        run.complete(WorkflowStep::FetchInvoices);
        let result = run.fail(WorkflowStep::BuildXml, "batch has no records");

        assert!(!result.success);
        assert!(result.finished_at.is_some());
        assert!(result.duration_secs.unwrap() >= 0.0);
        assert_eq!(result.completed_steps, vec![WorkflowStep::FetchInvoices]);
        assert_eq!(result.errors, vec!["construir_xml: batch has no records"]);
    }

    #[test]
    fn json_uses_report_keys() {
        let mut run = RunRecorder::start();
        run.complete(WorkflowStep::FetchInvoices);
        run.set_protocol(Protocol("TESTE_1".into()));
        let json = serde_json::to_value(run.succeed()).unwrap();

        for key in [
            "sucesso",
            "inicio",
            "fim",
            "duracao_segundos",
            "etapas_concluidas",
            "protocolo",
            "nfse_geradas",
            "erros",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["sucesso"], true);
        assert_eq!(json["protocolo"], "TESTE_1");
        assert_eq!(json["etapas_concluidas"][0], "obter_faturas");
    }
}
