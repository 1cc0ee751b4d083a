// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interpreting ABRASF response documents.

use nfse_core::{
    GeneratedInvoice, ProcessingStatus, Protocol, ServiceFailure, StatusReport, SubmissionResult,
};
use nfse_xml::{Document, Element};

use crate::envelope::extract_payload;

/// `EnviarLoteRpsResposta`: protocol, business rejection, or neither.
pub fn parse_submission(body: &str) -> SubmissionResult {
    let payload = match extract_payload(body) {
        Ok(payload) => payload,
        Err(failure) => return SubmissionResult::Failed(failure),
    };

    if payload.root.find("Protocolo").is_some() {
        return SubmissionResult::Accepted {
            protocol: payload.root.find_text("Protocolo").map(Protocol),
            raw_response: body.to_string(),
        };
    }

    if let Some((code, message)) = first_message(&payload) {
        return SubmissionResult::Rejected {
            code,
            message,
            raw_response: body.to_string(),
        };
    }

    SubmissionResult::Failed(ServiceFailure::parse(
        "INVALID_RESPONSE",
        "response has neither Protocolo nor MensagemRetorno",
    ))
}

/// `ConsultarSituacaoLoteRpsResposta`: the `Situacao` code.
pub fn parse_status(body: &str, protocol: &Protocol) -> Result<StatusReport, ServiceFailure> {
    let payload = extract_payload(body)?;

    let Some(situacao) = payload.root.find_text("Situacao") else {
        let detail = first_message(&payload)
            .map(|(code, message)| format!(": [{code}] {message}"))
            .unwrap_or_default();
        return Err(ServiceFailure::parse(
            "STATUS_NOT_FOUND",
            format!("response has no Situacao{detail}"),
        ));
    };

    let status = situacao
        .parse::<u8>()
        .ok()
        .and_then(ProcessingStatus::from_code)
        .ok_or_else(|| {
            ServiceFailure::parse("INVALID_RESPONSE", format!("unknown Situacao `{situacao}`"))
        })?;

    Ok(StatusReport {
        protocol: protocol.clone(),
        status,
        raw_response: body.to_string(),
    })
}

/// `ConsultarLoteRpsResposta`: every `CompNfse`, parsed leniently.
///
/// A response with no `CompNfse` but a `MensagemRetorno` is a failure;
/// with neither it is an empty list.
pub fn parse_invoices(body: &str) -> Result<Vec<GeneratedInvoice>, ServiceFailure> {
    let payload = extract_payload(body)?;
    let compositions = payload.root.find_all("CompNfse");

    if compositions.is_empty() {
        if let Some((code, message)) = first_message(&payload) {
            return Err(ServiceFailure::parse(
                "NFSE_RETRIEVAL_ERROR",
                format!("[{code}] {message}"),
            ));
        }
    }

    Ok(compositions.into_iter().map(generated_invoice).collect())
}

fn generated_invoice(composition: &Element) -> GeneratedInvoice {
    let info = composition.find("InfNfse").unwrap_or(composition);
    let direct = |name: &str| {
        info.child(name)
            .map(|e| e.text().trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| info.find_text(name))
    };
    let amount = |name: &str| {
        info.find_text(name)
            .and_then(|v| v.replace(',', ".").parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    GeneratedInvoice {
        number: direct("Numero"),
        verification_code: direct("CodigoVerificacao"),
        issued_at: direct("DataEmissao"),
        taxable_amount: amount("ValorServicos"),
        tax_amount: amount("ValorIss"),
        raw_xml: composition.to_fragment_string().unwrap_or_default(),
    }
}

fn first_message(payload: &Document) -> Option<(String, String)> {
    let message = payload.root.find("MensagemRetorno")?;
    Some((
        message.find_text("Codigo").unwrap_or_default(),
        message.find_text("Mensagem").unwrap_or_default(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns="http://www.abrasf.org.br/nfse.xsd""#;

    #[test]
    fn submission_accepted() {
        let body = format!(
            "<EnviarLoteRpsResposta {NS}><NumeroLote>1</NumeroLote><Protocolo>ABC</Protocolo></EnviarLoteRpsResposta>"
        );
        match parse_submission(&body) {
            SubmissionResult::Accepted { protocol, .. } => {
                assert_eq!(protocol, Some(Protocol("ABC".into())))
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[test]
    fn empty_protocol_is_accepted_without_one() {
        let body = "<EnviarLoteRpsResposta><Protocolo/></EnviarLoteRpsResposta>";
        assert!(matches!(
            parse_submission(body),
            SubmissionResult::Accepted { protocol: None, .. }
        ));
    }

    #[test]
    fn submission_rejected() {
        let body = format!(
            "<EnviarLoteRpsResposta {NS}><ListaMensagemRetorno><MensagemRetorno><Codigo>E160</Codigo><Mensagem>Lote ja enviado</Mensagem></MensagemRetorno></ListaMensagemRetorno></EnviarLoteRpsResposta>"
        );
        match parse_submission(&body) {
            SubmissionResult::Rejected { code, message, .. } => {
                assert_eq!(code, "E160");
                assert_eq!(message, "Lote ja enviado");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn inline_rejection_with_markup_in_message() {
        let body = "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\"><soap:Body>\
             <EnviarLoteRpsResposta><ListaMensagemRetorno><MensagemRetorno><Codigo>E160</Codigo>\
             <Mensagem>&lt;Cnpj&gt; do prestador invalido</Mensagem></MensagemRetorno></ListaMensagemRetorno>\
             </EnviarLoteRpsResposta></soap:Body></soap:Envelope>";
        match parse_submission(body) {
            SubmissionResult::Rejected { code, message, .. } => {
                assert_eq!(code, "E160");
                assert_eq!(message, "<Cnpj> do prestador invalido");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn submission_without_known_elements_is_invalid() {
        match parse_submission("<Resposta/>") {
            SubmissionResult::Failed(failure) => assert_eq!(failure.code, "INVALID_RESPONSE"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn status_codes() {
        let protocol = Protocol("P".into());
        let report = parse_status(
            "<ConsultarSituacaoLoteRpsResposta><NumeroLote>1</NumeroLote><Situacao>3</Situacao></ConsultarSituacaoLoteRpsResposta>",
            &protocol,
        )
        .unwrap();
        assert_eq!(report.status, ProcessingStatus::Error);

        let missing = parse_status("<R/>", &protocol).unwrap_err();
        assert_eq!(missing.code, "STATUS_NOT_FOUND");

        let unknown = parse_status("<R><Situacao>9</Situacao></R>", &protocol).unwrap_err();
        assert_eq!(unknown.code, "INVALID_RESPONSE");
    }

    #[test]
    fn invoices_are_parsed_leniently() {
        let body = format!(
            "<ConsultarLoteRpsResposta {NS}><ListaNfse>\
             <CompNfse><Nfse><InfNfse><Numero>000000001</Numero><CodigoVerificacao>ABC123</CodigoVerificacao>\
             <DataEmissao>2025-09-30T11:30:00</DataEmissao><IdentificacaoRps><Numero>1</Numero></IdentificacaoRps>\
             <Servico><Valores><ValorServicos>1000.00</ValorServicos><ValorIss>50.00</ValorIss></Valores></Servico>\
             </InfNfse></Nfse></CompNfse>\
             <CompNfse><Nfse><InfNfse><Numero>000000002</Numero></InfNfse></Nfse></CompNfse>\
             </ListaNfse></ConsultarLoteRpsResposta>"
        );
        let invoices = parse_invoices(&body).unwrap();
        assert_eq!(invoices.len(), 2);

        assert_eq!(invoices[0].number.as_deref(), Some("000000001"));
        assert_eq!(invoices[0].verification_code.as_deref(), Some("ABC123"));
        assert_eq!(invoices[0].taxable_amount, 1000.0);
        assert_eq!(invoices[0].tax_amount, 50.0);
        assert!(invoices[0].raw_xml.starts_with("<CompNfse>"));

        assert_eq!(invoices[1].number.as_deref(), Some("000000002"));
        assert_eq!(invoices[1].verification_code, None);
        assert_eq!(invoices[1].taxable_amount, 0.0);
    }

    #[test]
    fn invoice_query_error_message() {
        let body = "<ConsultarLoteRpsResposta><ListaMensagemRetorno><MensagemRetorno><Codigo>E4</Codigo><Mensagem>Lote nao encontrado</Mensagem></MensagemRetorno></ListaMensagemRetorno></ConsultarLoteRpsResposta>";
        let failure = parse_invoices(body).unwrap_err();
        assert_eq!(failure.code, "NFSE_RETRIEVAL_ERROR");
        assert!(failure.message.contains("Lote nao encontrado"));
    }
}
