// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoice records, batch identity, and remote-service outcome types.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::taxid;

/// Opaque batch protocol assigned by the municipality on submission.
///
/// Correlation key for every status and result query of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Protocol(pub String);

impl Protocol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Batch number in `YYYYMMDDhhmmss` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchNumber(pub u64);

impl fmt::Display for BatchNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service provider (issuer) identity carried in every batch and query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Issuer CNPJ, digits only.
    pub cnpj: String,
    /// Municipal registration (inscrição municipal).
    pub inscricao_municipal: String,
}

/// Postal address of the service taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub district: String,
    /// IBGE municipality code.
    pub municipality_code: String,
    /// Two-letter state abbreviation.
    pub state: String,
    pub postal_code: String,
}

/// The service taker (tomador).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    /// CNPJ or CPF, digits only.
    pub tax_id: String,
    pub legal_name: String,
    pub address: Address,
}

/// One RPS (recibo provisório de serviços) to be converted into an NFSe.
///
/// Immutable once handed to batch construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Value of the `id` attribute on `InfRps`; must be unique within a batch.
    pub id: String,
    pub number: String,
    pub series: String,
    /// RPS type (1 = RPS, 2 = mixed note, 3 = coupon).
    pub rps_type: u8,
    pub issued_at: NaiveDateTime,
    /// RPS status (1 = normal, 2 = cancelled).
    pub status: u8,
    pub description: String,
    /// Entry in the municipal service list (`ItemListaServico`).
    pub service_code: String,
    pub taxable_amount: f64,
    pub tax_amount: f64,
    /// ISS rate as a fraction (0.05 = 5%).
    pub tax_rate: f64,
    pub tax_withheld: bool,
    /// IBGE code of the municipality where the service was rendered.
    pub municipality_code: String,
    pub payer: Payer,
}

impl InvoiceRecord {
    /// Checks the fields the municipality rejects outright.
    ///
    /// Returns every problem found, empty when the record is acceptable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.id.trim().is_empty() {
            problems.push("RPS id is required".to_string());
        }
        if self.number.trim().is_empty() {
            problems.push(format!("RPS {}: number is required", self.id));
        }
        if self.taxable_amount <= 0.0 {
            problems.push(format!("RPS {}: service amount must be positive", self.id));
        }
        if self.service_code.trim().is_empty() {
            problems.push(format!("RPS {}: service list item is required", self.id));
        }
        if self.description.trim().is_empty() {
            problems.push(format!("RPS {}: service description is required", self.id));
        }
        if self.payer.legal_name.trim().is_empty() {
            problems.push(format!("RPS {}: payer legal name is required", self.id));
        }
        if !taxid::is_valid_cnpj(&self.payer.tax_id) && !taxid::is_valid_cpf(&self.payer.tax_id) {
            problems.push(format!(
                "RPS {}: payer tax id `{}` is neither a valid CNPJ nor CPF",
                self.id, self.payer.tax_id
            ));
        }

        problems
    }
}

/// An ordered set of records submitted together under one batch number.
#[derive(Debug, Clone)]
pub struct Batch {
    pub number: BatchNumber,
    pub provider: ProviderIdentity,
    pub records: Vec<InvoiceRecord>,
}

impl Batch {
    pub fn new(number: BatchNumber, provider: ProviderIdentity, records: Vec<InvoiceRecord>) -> Self {
        Self {
            number,
            provider,
            records,
        }
    }

    /// The `id` attribute of the `LoteRps` element.
    pub fn element_id(&self) -> String {
        format!("lote_{}", self.number)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Remote processing state of a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingStatus {
    NotReceived = 1,
    Processing = 2,
    Error = 3,
    Success = 4,
}

impl ProcessingStatus {
    /// Maps a `Situacao` code to a status; unknown codes yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::NotReceived),
            2 => Some(Self::Processing),
            3 => Some(Self::Error),
            4 => Some(Self::Success),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// `Error` and `Success` end polling.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Success)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NotReceived => "Não Recebido",
            Self::Processing => "Processando",
            Self::Error => "Erro no Processamento",
            Self::Success => "Processado com Sucesso",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code(), self.description())
    }
}

/// One successful status query.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub protocol: Protocol,
    pub status: ProcessingStatus,
    pub raw_response: String,
}

/// Why a remote call produced no business answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Connection refused, DNS, TLS, non-2xx HTTP status.
    Transport,
    /// Per-call connect or total timeout elapsed.
    Timeout,
    /// The service answered with a SOAP Fault.
    SoapFault,
    /// The response body could not be parsed or lacked the expected element.
    Parse,
}

/// A remote call that failed below the business layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    pub kind: FailureKind,
    /// Machine-readable code (`TRANSPORT_ERROR`, `SOAP_FAULT`, `PROCESSING_ERROR`, ...).
    pub code: String,
    pub message: String,
}

impl ServiceFailure {
    pub fn new(kind: FailureKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, "TRANSPORT_ERROR", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, "TIMEOUT", message)
    }

    pub fn soap_fault(message: impl Into<String>) -> Self {
        Self::new(FailureKind::SoapFault, "SOAP_FAULT", message)
    }

    pub fn parse(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Parse, code, message)
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Outcome of submitting a signed batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    /// The service accepted the batch. The protocol can still be absent when
    /// the response carried an empty `Protocolo` element.
    Accepted {
        protocol: Option<Protocol>,
        raw_response: String,
    },
    /// The service rejected the batch with a business error (`MensagemRetorno`).
    Rejected {
        code: String,
        message: String,
        raw_response: String,
    },
    /// The call itself failed.
    Failed(ServiceFailure),
}

impl SubmissionResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn protocol(&self) -> Option<&Protocol> {
        match self {
            Self::Accepted { protocol, .. } => protocol.as_ref(),
            _ => None,
        }
    }
}

/// An NFSe generated by the municipality for one RPS of the batch.
///
/// Every field is lenient: a missing element leaves `None` or `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedInvoice {
    #[serde(rename = "numero")]
    pub number: Option<String>,
    #[serde(rename = "codigo_verificacao")]
    pub verification_code: Option<String>,
    #[serde(rename = "data_emissao")]
    pub issued_at: Option<String>,
    #[serde(rename = "valor_servicos")]
    pub taxable_amount: f64,
    #[serde(rename = "valor_iss")]
    pub tax_amount: f64,
    /// The `CompNfse` fragment as received.
    #[serde(rename = "xml_completo", skip_serializing_if = "String::is_empty", default)]
    pub raw_xml: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_record() -> InvoiceRecord {
        InvoiceRecord {
            id: "rps_1".into(),
            number: "1".into(),
            series: "1".into(),
            rps_type: 1,
            issued_at: chrono::NaiveDate::from_ymd_opt(2025, 9, 30)
                .and_then(|d| d.and_hms_opt(10, 0, 0))
                .unwrap(),
            status: 1,
            description: "Consultoria".into(),
            service_code: "01.01".into(),
            taxable_amount: 1000.0,
            tax_amount: 50.0,
            tax_rate: 0.05,
            tax_withheld: false,
            municipality_code: "2700102".into(),
            payer: Payer {
                tax_id: "12345678000195".into(),
                legal_name: "Empresa Tomadora".into(),
                address: Address {
                    street: "Rua das Flores".into(),
                    number: "123".into(),
                    district: "Centro".into(),
                    municipality_code: "2700102".into(),
                    state: "AL".into(),
                    postal_code: "57300000".into(),
                },
            },
        }
    }

    #[test]
    fn status_codes_map_both_ways() {
        for code in 1..=4u8 {
            let status = ProcessingStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert_eq!(ProcessingStatus::from_code(0), None);
        assert_eq!(ProcessingStatus::from_code(5), None);
    }

    #[test]
    fn only_error_and_success_are_terminal() {
        assert!(!ProcessingStatus::NotReceived.is_terminal());
        assert!(!ProcessingStatus::Processing.is_terminal());
        assert!(ProcessingStatus::Error.is_terminal());
        assert!(ProcessingStatus::Success.is_terminal());
    }

    #[test]
    fn status_display_includes_description() {
        assert_eq!(
            ProcessingStatus::Success.to_string(),
            "4 - Processado com Sucesso"
        );
    }

    #[test]
    fn valid_record_has_no_problems() {
        assert!(sample_record().validate().is_empty());
    }

    #[test]
    fn record_validation_collects_every_problem() {
        let mut record = sample_record();
        record.number = String::new();
        record.taxable_amount = 0.0;
        record.payer.tax_id = "11111111111111".into();
        let problems = record.validate();
        assert_eq!(problems.len(), 3, "got: {problems:?}");
    }

    #[test]
    fn batch_element_id_uses_number() {
        let batch = Batch::new(
            BatchNumber(20250930112656),
            ProviderIdentity {
                cnpj: "32649500000145".into(),
                inscricao_municipal: "123".into(),
            },
            vec![sample_record()],
        );
        assert_eq!(batch.element_id(), "lote_20250930112656");
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn submission_protocol_only_on_accept() {
        let accepted = SubmissionResult::Accepted {
            protocol: Some(Protocol("P1".into())),
            raw_response: String::new(),
        };
        let rejected = SubmissionResult::Rejected {
            code: "E10".into(),
            message: "RPS já informado".into(),
            raw_response: String::new(),
        };
        assert_eq!(accepted.protocol().map(Protocol::as_str), Some("P1"));
        assert!(rejected.protocol().is_none());
        assert!(!SubmissionResult::Failed(ServiceFailure::transport("down")).is_accepted());
    }

    #[test]
    fn failure_kind_serializes_screaming_snake() {
        assert_eq!(FailureKind::SoapFault.to_string(), "SOAP_FAULT");
    }

    #[test]
    fn generated_invoice_uses_portuguese_keys() {
        let invoice = GeneratedInvoice {
            number: Some("000000001".into()),
            verification_code: Some("ABC123".into()),
            issued_at: None,
            taxable_amount: 1000.0,
            tax_amount: 50.0,
            raw_xml: String::new(),
        };
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["numero"], "000000001");
        assert_eq!(json["codigo_verificacao"], "ABC123");
        assert!(json.get("xml_completo").is_none());
    }
}
